//! Text-to-phoneme conversion via the system espeak-ng binary.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

use super::model::KokoroError;

/// espeak-ng voice for a single-character Kokoro language code.
///
/// Codes missing from the table fall back to American English, matching the
/// model's dominant training language.
pub fn espeak_voice(lang_code: char) -> &'static str {
    match lang_code {
        'a' => "en-us",
        'b' => "en-gb",
        'c' => "de",
        'e' => "es",
        'f' => "fr",
        'h' => "hi",
        'i' => "it",
        'j' => "ja",
        'p' => "pt-br",
        'z' => "cmn",
        _ => "en-us",
    }
}

/// A lexical piece of the input: a run of words, or a single punctuation
/// mark that carries its own token ID.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Words(String),
    Punct(char),
}

/// Convert text to Kokoro phoneme token IDs.
///
/// Word runs go through espeak-ng (`--ipa --stdin -q`) and the resulting IPA
/// characters are mapped through `vocab`; punctuation is mapped directly.
/// Characters absent from the vocab are silently dropped, matching the
/// Python reference implementation.
pub fn phonemize(
    text: &str,
    espeak_lang: &str,
    vocab: &HashMap<char, i64>,
) -> Result<Vec<i64>, KokoroError> {
    let pieces = tokenize(text);

    let runs: Vec<&str> = pieces
        .iter()
        .filter_map(|p| match p {
            Piece::Words(run) => Some(run.as_str()),
            Piece::Punct(_) => None,
        })
        .collect();
    let run_ids = phonemize_runs(&runs, espeak_lang, vocab)?;

    let mut ids = Vec::new();
    let mut next_run = 0usize;
    for piece in &pieces {
        match piece {
            Piece::Words(_) => {
                if let Some(chunk) = run_ids.get(next_run) {
                    ids.extend_from_slice(chunk);
                }
                next_run += 1;
            }
            Piece::Punct(ch) => {
                if let Some(&id) = vocab.get(ch) {
                    ids.push(id);
                }
            }
        }
    }
    Ok(ids)
}

/// Split text into word runs and boundary punctuation.
///
/// A `.` or `,` between two digits stays inside the run ("2.0", "1,000");
/// newlines act as sentence terminators.
fn tokenize(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut run = String::new();

    for (idx, ch) in text.char_indices() {
        let boundary = match ch {
            '.' | ',' if digits_surround(text, idx, ch.len_utf8()) => None,
            '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
            | '\u{201d}' => Some(ch),
            '\n' | '\r' => Some('.'),
            _ => None,
        };

        if let Some(punct) = boundary {
            flush_run(&mut pieces, &mut run);
            pieces.push(Piece::Punct(punct));
            continue;
        }
        if ch.is_whitespace() {
            if !run.is_empty() && !run.ends_with(' ') {
                run.push(' ');
            }
            continue;
        }
        run.push(ch);
    }

    flush_run(&mut pieces, &mut run);
    pieces
}

fn flush_run(pieces: &mut Vec<Piece>, run: &mut String) {
    let trimmed = run.trim();
    if !trimmed.is_empty() {
        pieces.push(Piece::Words(trimmed.to_string()));
    }
    run.clear();
}

fn digits_surround(text: &str, idx: usize, ch_len: usize) -> bool {
    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch_len..].chars().next();
    matches!(
        (prev, next),
        (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit()
    )
}

/// Phonemize all word runs in a single espeak-ng invocation.
///
/// espeak-ng emits one output line per stdin line; if that assumption breaks
/// (some voices merge lines), fall back to one invocation per run.
fn phonemize_runs(
    runs: &[&str],
    lang: &str,
    vocab: &HashMap<char, i64>,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    if runs.is_empty() {
        return Ok(Vec::new());
    }

    let ipa = run_espeak(&runs.join("\n"), lang)?;
    let lines: Vec<&str> = ipa.lines().collect();
    if lines.len() == runs.len() {
        return Ok(lines.iter().map(|line| ipa_to_ids(line, vocab)).collect());
    }

    runs.iter()
        .map(|run| Ok(ipa_to_ids(&run_espeak(run, lang)?, vocab)))
        .collect()
}

/// Run espeak-ng over stdin and capture its IPA output.
fn run_espeak(input: &str, lang: &str) -> Result<String, KokoroError> {
    let mut child = Command::new("espeak-ng")
        .args(["--ipa", "--stdin", "-q", "-v", lang])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KokoroError::EspeakNotFound
            } else {
                KokoroError::Io(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        // espeak-ng under-processes the final token of an unterminated line;
        // always hand it a newline-terminated payload.
        stdin.write_all(input.as_bytes())?;
        if !input.ends_with('\n') {
            stdin.write_all(b"\n")?;
        }
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KokoroError::Phonemizer(format!(
            "espeak-ng exited with code {:?}: {stderr}",
            output.status.code()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Map IPA output characters to token IDs, dropping anything not in the
/// vocab. espeak's `_` tie markers are never tokens.
fn ipa_to_ids(ipa: &str, vocab: &HashMap<char, i64>) -> Vec<i64> {
    ipa.lines()
        .flat_map(|line| line.trim().chars())
        .filter(|&ch| ch != '_')
        .filter_map(|ch| vocab.get(&ch).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vocab() -> HashMap<char, i64> {
        [('x', 100), ('y', 101), (',', 3), ('.', 4), ('!', 5)]
            .into_iter()
            .collect()
    }

    #[test]
    fn tokenizes_words_and_punctuation() {
        assert_eq!(
            tokenize("Hello, world. Testing!"),
            vec![
                Piece::Words("Hello".to_string()),
                Piece::Punct(','),
                Piece::Words("world".to_string()),
                Piece::Punct('.'),
                Piece::Words("Testing".to_string()),
                Piece::Punct('!'),
            ]
        );
    }

    #[test]
    fn keeps_numeric_separators_inside_runs() {
        assert_eq!(
            tokenize("Version 2.0 reached 1,000 users."),
            vec![
                Piece::Words("Version 2.0 reached 1,000 users".to_string()),
                Piece::Punct('.'),
            ]
        );
    }

    #[test]
    fn splits_comma_not_between_digits() {
        assert_eq!(
            tokenize("Value 2, next"),
            vec![
                Piece::Words("Value 2".to_string()),
                Piece::Punct(','),
                Piece::Words("next".to_string()),
            ]
        );
    }

    #[test]
    fn newline_becomes_sentence_terminator() {
        assert_eq!(
            tokenize("one\ntwo"),
            vec![
                Piece::Words("one".to_string()),
                Piece::Punct('.'),
                Piece::Words("two".to_string()),
            ]
        );
    }

    #[test]
    fn ipa_mapping_drops_unknown_chars_and_ties() {
        let ids = ipa_to_ids("x_zy", &test_vocab());
        assert_eq!(ids, vec![100, 101]);
    }

    #[test]
    fn known_codes_map_to_espeak_voices() {
        assert_eq!(espeak_voice('a'), "en-us");
        assert_eq!(espeak_voice('b'), "en-gb");
        assert_eq!(espeak_voice('z'), "cmn");
        assert_eq!(espeak_voice('q'), "en-us");
    }

    #[test]
    fn phonemize_preserves_punctuation_order() {
        // Skip when espeak-ng is unavailable in the execution environment.
        if Command::new("espeak-ng").arg("--version").output().is_err() {
            return;
        }
        let vocab = test_vocab();
        let ids = phonemize("Hello, world.", "en-us", &vocab).expect("phonemize");
        // Only punctuation survives this tiny vocab; order must hold.
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        let ids = phonemize("", "en-us", &test_vocab()).expect("phonemize");
        assert!(ids.is_empty());
    }
}
