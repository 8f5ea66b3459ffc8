//! Kokoro-82M synthesis: model loading, phonemization, and the per-request
//! pipeline.
//!
//! The model directory is expected to look like:
//!
//! ```text
//! Kokoro-82M/
//! ├── kokoro-v1_0.onnx    # model weights (any *.onnx file is accepted)
//! ├── config.json         # phoneme vocabulary
//! └── voices/
//!     ├── af_bella.npy    # one style-vector file per voice
//!     ├── bf_emma.npy
//!     └── ...
//! ```
//!
//! Voice names follow `{lang}{gender}_{name}`: `af_bella` is American English
//! female "bella", `jf_alpha` Japanese female "alpha". The leading character
//! is the language code used for both UI grouping and phonemization.
//!
//! **espeak-ng** must be installed on the system; it performs text-to-IPA
//! conversion before tokens are fed to the ONNX model.

pub mod model;
pub mod phonemizer;
pub mod pipeline;
pub mod vocab;
pub mod voice;

pub use model::{KokoroError, KokoroModel, SAMPLE_RATE};
pub use pipeline::Pipeline;
