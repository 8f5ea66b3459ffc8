use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

/// Maximum number of phoneme tokens per inference call (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

/// Output sample rate of the Kokoro model.
pub const SAMPLE_RATE: u32 = 24_000;

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    Phonemizer(String),
    #[error("Voice '{0}' not found in the catalog")]
    VoiceNotFound(String),
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(String),
}

/// Process-lifetime Kokoro model state, loaded once at startup.
///
/// Everything here is read-only after [`KokoroModel::load`] except the ORT
/// session, which needs `&mut` to run and therefore sits behind a mutex.
/// Concurrent requests serialize on inference only.
pub struct KokoroModel {
    session: Mutex<Session>,
    vocab: HashMap<char, i64>,
    /// Detected token input name: "input_ids" or "tokens".
    tokens_input_name: String,
    /// True if the speed input expects int32, false for float32.
    speed_is_int32: bool,
}

impl KokoroModel {
    /// Load the model from its root directory.
    ///
    /// The directory must contain an `.onnx` weights file and a `config.json`
    /// with the phoneme vocabulary.
    pub fn load(root: &Path) -> Result<Self, KokoroError> {
        let onnx_path = find_onnx_file(root)?;
        log::info!("Loading Kokoro model from {}", onnx_path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_execution_providers(vec![CPUExecutionProvider::default().build()])?
            .with_parallel_execution(true)?
            .commit_from_file(&onnx_path)?;

        let tokens_input_name = detect_tokens_input(&session);
        let speed_is_int32 = detect_speed_type(&session);
        log::info!(
            "Detected: tokens_input='{tokens_input_name}', speed_is_int32={speed_is_int32}"
        );

        let config_path = root.join("config.json");
        let vocab = super::vocab::load_vocab(&config_path)?;
        log::info!("Loaded {} vocab entries from {}", vocab.len(), config_path.display());

        Ok(Self {
            session: Mutex::new(session),
            vocab,
            tokens_input_name,
            speed_is_int32,
        })
    }

    /// Phoneme-to-token-ID vocabulary from config.json.
    pub fn vocab(&self) -> &HashMap<char, i64> {
        &self.vocab
    }

    /// Run one inference call: phoneme token IDs + style vector + speed in,
    /// mono f32 waveform at [`SAMPLE_RATE`] out.
    pub fn infer(
        &self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        let seq_len = tokens.len() + 2; // +2 for padding tokens

        // Tokens tensor: [[0, t1..tN, 0]]
        let mut padded = vec![0i64; seq_len];
        padded[1..seq_len - 1].copy_from_slice(tokens);
        let tokens_arr = Array2::from_shape_vec((1, seq_len), padded)?;

        let style_view = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let mut session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let output = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[speed as i32]);
            session.run(inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        } else {
            let speed_arr = ndarray::arr1(&[speed]);
            session.run(inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        };

        let first_output = output
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("No output from model")))?;
        let waveform = first_output.1.try_extract_array::<f32>()?;

        Ok(waveform.as_slice().unwrap_or(&[]).to_vec())
    }
}

/// Find the ONNX weights file in the model root.
///
/// Prefers `kokoro-v1_0.onnx`, then falls back to the first `.onnx` file
/// found.
fn find_onnx_file(root: &Path) -> Result<PathBuf, KokoroError> {
    let preferred = root.join("kokoro-v1_0.onnx");
    if preferred.exists() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            log::info!("Using ONNX file: {}", path.display());
            return Ok(path);
        }
    }

    Err(KokoroError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("No .onnx file found in {}", root.display()),
    )))
}

/// Detect the token input name ("input_ids" or "tokens") from session inputs.
fn detect_tokens_input(session: &Session) -> String {
    for input in &session.inputs {
        if input.name == "input_ids" || input.name == "tokens" {
            return input.name.to_string();
        }
    }
    "input_ids".to_string()
}

/// Detect whether the speed input expects int32 (true) or float32 (false).
fn detect_speed_type(session: &Session) -> bool {
    for input in &session.inputs {
        if input.name == "speed" {
            let type_str = format!("{:?}", input.input_type);
            return type_str.contains("Int32") || type_str.contains("int32");
        }
    }
    // Modern Kokoro exports use int32
    true
}
