//! Per-request synthesis pipeline.
//!
//! A [`Pipeline`] is bound to one language code and the shared model. Driving
//! it decomposes the text left-to-right into sentence-ish segments and lazily
//! synthesizes one segment per iterator step, so the caller can stream audio
//! into a sink as it is produced.

use std::path::Path;

use super::model::{KokoroError, KokoroModel, MAX_PHONEME_LEN};
use super::phonemizer::{espeak_voice, phonemize};
use super::voice::VoiceStyles;

pub struct Pipeline<'m> {
    model: &'m KokoroModel,
    espeak_lang: &'static str,
}

impl<'m> Pipeline<'m> {
    /// Bind a pipeline to a language code and the shared model.
    pub fn new(lang_code: char, model: &'m KokoroModel) -> Self {
        Self {
            model,
            espeak_lang: espeak_voice(lang_code),
        }
    }

    /// Start synthesis of `text` with the voice asset at `voice_path`.
    ///
    /// Loads the voice's style vectors up front, then returns a lazy iterator
    /// of audio segments in text order. Segments that phonemize to nothing
    /// are skipped.
    pub fn synthesize(
        &self,
        text: &str,
        voice_path: &Path,
        speed: f32,
    ) -> Result<AudioSegments<'m>, KokoroError> {
        let styles = VoiceStyles::load(voice_path)?;
        let segments = split_segments(text);
        if segments.is_empty() {
            log::warn!("No speakable segments in text: {text:?}");
        }
        Ok(AudioSegments {
            model: self.model,
            espeak_lang: self.espeak_lang,
            styles,
            speed,
            segments: segments.into_iter(),
        })
    }
}

/// Lazy, finite, ordered sequence of synthesized audio segments.
pub struct AudioSegments<'m> {
    model: &'m KokoroModel,
    espeak_lang: &'static str,
    styles: VoiceStyles,
    speed: f32,
    segments: std::vec::IntoIter<String>,
}

impl AudioSegments<'_> {
    fn synthesize_segment(&self, segment: &str) -> Result<Vec<f32>, KokoroError> {
        let ids = phonemize(segment, self.espeak_lang, self.model.vocab())?;
        if ids.is_empty() {
            log::debug!("No phoneme tokens for segment: {segment:?}");
            return Ok(Vec::new());
        }

        // Keep the style index stable across sub-chunks so an oversized
        // segment doesn't shift prosody mid-sentence.
        let style = self.styles.for_token_count(ids.len());

        let chunks = if ids.len() > MAX_PHONEME_LEN {
            log::debug!(
                "Segment exceeds {MAX_PHONEME_LEN} phoneme tokens ({}), splitting",
                ids.len()
            );
            split_token_chunks(&ids, &punctuation_ids(self.model.vocab()))
        } else {
            vec![ids]
        };

        let mut samples = Vec::new();
        for chunk in &chunks {
            samples.extend(self.model.infer(chunk, style, self.speed)?);
        }
        Ok(samples)
    }
}

impl Iterator for AudioSegments<'_> {
    type Item = Result<Vec<f32>, KokoroError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let segment = self.segments.next()?;
            match self.synthesize_segment(&segment) {
                Ok(samples) if samples.is_empty() => continue,
                result => return Some(result),
            }
        }
    }
}

/// Decompose text into sentence-ish segments, preserving order.
///
/// Splits after `.`, `!`, `?` and `…` (unless the dot sits between digits)
/// and at line breaks. Whitespace-only segments are dropped.
fn split_segments(text: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    let mut prev: Option<char> = None;

    while let Some(ch) = chars.next() {
        if matches!(ch, '\n' | '\r') {
            flush_segment(&mut segments, &mut current);
            prev = Some(ch);
            continue;
        }
        current.push(ch);
        let terminal = match ch {
            '.' => {
                let next_digit = chars.peek().is_some_and(|c| c.is_ascii_digit());
                let prev_digit = prev.is_some_and(|c| c.is_ascii_digit());
                !(prev_digit && next_digit)
            }
            '!' | '?' | '…' => true,
            _ => false,
        };
        if terminal {
            flush_segment(&mut segments, &mut current);
        }
        prev = Some(ch);
    }

    flush_segment(&mut segments, &mut current);
    segments
}

fn flush_segment(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Token IDs of the punctuation marks usable as chunk split points.
fn punctuation_ids(vocab: &std::collections::HashMap<char, i64>) -> Vec<i64> {
    [';', ':', ',', '.', '!', '?']
        .iter()
        .filter_map(|ch| vocab.get(ch).copied())
        .collect()
}

/// Split an oversized token sequence into chunks of at most
/// [`MAX_PHONEME_LEN`], preferring to cut just after punctuation.
fn split_token_chunks(ids: &[i64], punct_ids: &[i64]) -> Vec<Vec<i64>> {
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < ids.len() {
        let end = (start + MAX_PHONEME_LEN).min(ids.len());
        if end == ids.len() {
            chunks.push(ids[start..end].to_vec());
            break;
        }

        let split = ids[start..end]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, id)| punct_ids.contains(id))
            .map(|(i, _)| start + i + 1)
            .unwrap_or(end);

        chunks.push(ids[start..split].to_vec());
        start = split;
    }

    chunks
}
