//! Audio sink: accumulates pipeline segments into one playable WAV file.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::kokoro::{KokoroError, SAMPLE_RATE};

/// A finished, playable audio file on temporary storage.
///
/// The file is not cleaned up by this crate; ownership passes to the UI layer
/// and reclamation is left to the OS temp directory.
#[derive(Debug)]
pub struct AudioArtifact {
    pub path: PathBuf,
    /// Number of mono frames written.
    pub frames: u64,
}

/// Streaming writer for one synthesis request.
///
/// Opens a fresh named temp file at a fixed mono 24 kHz float format and
/// appends segments in the order they are produced.
pub struct AudioSink {
    writer: hound::WavWriter<BufWriter<File>>,
    path: PathBuf,
    frames: u64,
}

impl AudioSink {
    pub fn create() -> Result<Self, KokoroError> {
        let tmp = tempfile::Builder::new()
            .prefix("kokoro-ui-")
            .suffix(".wav")
            .tempfile()?;
        // Keep the file on disk; the artifact must outlive the request.
        let (file, path) = tmp.keep().map_err(|e| KokoroError::Io(e.error))?;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let writer = hound::WavWriter::new(BufWriter::new(file), spec)?;

        Ok(Self {
            writer,
            path,
            frames: 0,
        })
    }

    /// Append one segment of mono samples.
    pub fn append(&mut self, samples: &[f32]) -> Result<(), KokoroError> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.frames += samples.len() as u64;
        Ok(())
    }

    /// Finalize the WAV header and hand the file over.
    pub fn finish(self) -> Result<AudioArtifact, KokoroError> {
        self.writer.finalize()?;
        Ok(AudioArtifact {
            path: self.path,
            frames: self.frames,
        })
    }
}
