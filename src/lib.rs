//! # kokoro-ui
//!
//! A local web front-end for the Kokoro-82M text-to-speech model.
//!
//! The crate wires three pieces together:
//!
//! - **Voice catalog** ([`catalog`]): discovers voice assets on disk and
//!   groups them by their single-character language prefix.
//! - **Synthesis pipeline** ([`kokoro`]): phonemizes text with espeak-ng and
//!   runs the Kokoro ONNX model, yielding audio segments sentence by sentence.
//! - **HTTP surface** ([`server`]): a single-page UI with dependent
//!   language/voice dropdowns and an autoplaying audio element.
//!
//! The model is loaded once at startup and shared read-only across requests;
//! each request writes a fresh mono 24 kHz WAV to temporary storage and hands
//! the path back to the UI for playback.

pub mod audio;
pub mod catalog;
pub mod kokoro;
pub mod server;

use serde::Deserialize;

use audio::{AudioArtifact, AudioSink};
use catalog::VoiceCatalog;
use kokoro::{KokoroError, KokoroModel, Pipeline};

/// Speech speed multiplier bounds exposed by the UI slider.
pub const SPEED_MIN: f32 = 0.5;
pub const SPEED_MAX: f32 = 2.0;

/// One synthesis request as submitted by the UI.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisRequest {
    /// Text to speak.
    pub text: String,
    /// Voice identifier, e.g. `"af_bella"`. The first character is the
    /// language code.
    pub voice: String,
    /// Speed multiplier. Values outside [`SPEED_MIN`]..=[`SPEED_MAX`] are
    /// clamped rather than rejected.
    pub speed: f32,
}

/// Synthesize a request into a WAV file on temporary storage.
///
/// Resolves the language code from the voice's first character, drives a
/// per-request [`Pipeline`] against the shared model, and appends each
/// produced segment in order to a fresh [`AudioSink`]. Returns the finished
/// artifact (path + frame count).
pub fn synthesize(
    model: &KokoroModel,
    catalog: &VoiceCatalog,
    request: &SynthesisRequest,
) -> Result<AudioArtifact, KokoroError> {
    log::info!(
        "synthesize called with text: {:?} voice: {} speed: {}",
        request.text,
        request.voice,
        request.speed
    );

    if !catalog.contains(&request.voice) {
        return Err(KokoroError::VoiceNotFound(request.voice.clone()));
    }
    let lang_code = request
        .voice
        .chars()
        .next()
        .ok_or_else(|| KokoroError::VoiceNotFound(request.voice.clone()))?;
    let speed = request.speed.clamp(SPEED_MIN, SPEED_MAX);

    let pipeline = Pipeline::new(lang_code, model);
    let voice_path = catalog.voice_path(&request.voice);

    let mut sink = AudioSink::create()?;
    for segment in pipeline.synthesize(&request.text, &voice_path, speed)? {
        sink.append(&segment?)?;
    }
    let artifact = sink.finish()?;

    log::info!(
        "{} frames written to {}",
        artifact.frames,
        artifact.path.display()
    );
    Ok(artifact)
}
