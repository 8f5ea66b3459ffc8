//! Voice asset loading.
//!
//! A voice asset is a single numpy `.npy` file holding a 2-D float32
//! little-endian array of shape `[N, 256]`: one 256-float style vector per
//! phoneme token count. Indexing by token count keeps prosody consistent
//! with how the voice was trained.

use std::path::Path;

use super::model::{KokoroError, STYLE_DIM};

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// The style vectors of one voice, loaded fresh per request from its asset
/// file.
pub struct VoiceStyles {
    vectors: Vec<[f32; STYLE_DIM]>,
}

impl VoiceStyles {
    /// Load a voice from its `.npy` asset file.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let data = std::fs::read(path).map_err(|e| {
            KokoroError::VoiceParse(format!("{}: {e}", path.display()))
        })?;
        let vectors = parse_npy(&data).map_err(|msg| {
            KokoroError::VoiceParse(format!("{}: {msg}", path.display()))
        })?;
        log::debug!("Loaded {} style vectors from {}", vectors.len(), path.display());
        Ok(Self { vectors })
    }

    /// Style vector for a given phoneme token count, clamped to range.
    pub fn for_token_count(&self, count: usize) -> &[f32; STYLE_DIM] {
        let idx = count.min(self.vectors.len() - 1);
        &self.vectors[idx]
    }
}

/// Parse a `.npy` payload into style vectors.
fn parse_npy(data: &[u8]) -> Result<Vec<[f32; STYLE_DIM]>, String> {
    if data.len() < 10 {
        return Err(format!("file too short ({} bytes)", data.len()));
    }
    if &data[0..6] != NPY_MAGIC {
        return Err("invalid numpy magic bytes".to_string());
    }

    // major version at [6], minor at [7], header_len at [8..10] (LE u16)
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let payload = data
        .get(10 + header_len..)
        .ok_or_else(|| format!("header truncated (need {} bytes)", 10 + header_len))?;

    if payload.len() % 4 != 0 {
        return Err(format!(
            "float data length {} is not a multiple of 4",
            payload.len()
        ));
    }
    let floats: Vec<f32> = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    if floats.is_empty() || floats.len() % STYLE_DIM != 0 {
        return Err(format!(
            "float count {} is not a positive multiple of {STYLE_DIM}",
            floats.len()
        ));
    }

    let vectors = floats
        .chunks_exact(STYLE_DIM)
        .map(|chunk| {
            let mut vec = [0f32; STYLE_DIM];
            vec.copy_from_slice(chunk);
            vec
        })
        .collect();
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Build a minimal .npy payload with the given style vectors.
    fn npy_bytes(vectors: &[Vec<f32>]) -> Vec<u8> {
        let header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {STYLE_DIM}), }}\n",
            vectors.len()
        );
        let mut out = Vec::new();
        out.extend_from_slice(NPY_MAGIC);
        out.extend_from_slice(&[1, 0]); // version 1.0
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for vector in vectors {
            for &f in vector {
                out.extend_from_slice(&f.to_le_bytes());
            }
        }
        out
    }

    fn write_asset(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp asset");
        file.write_all(bytes).expect("write asset");
        file
    }

    #[test]
    fn loads_style_vectors() {
        let v0: Vec<f32> = (0..STYLE_DIM).map(|i| i as f32).collect();
        let v1: Vec<f32> = (0..STYLE_DIM).map(|i| -(i as f32)).collect();
        let file = write_asset(&npy_bytes(&[v0.clone(), v1.clone()]));

        let styles = VoiceStyles::load(file.path()).expect("load");
        assert_eq!(styles.for_token_count(0).as_slice(), v0.as_slice());
        assert_eq!(styles.for_token_count(1).as_slice(), v1.as_slice());
    }

    #[test]
    fn token_count_clamps_to_last_vector() {
        let v0 = vec![0.5f32; STYLE_DIM];
        let v1 = vec![1.5f32; STYLE_DIM];
        let file = write_asset(&npy_bytes(&[v0, v1.clone()]));

        let styles = VoiceStyles::load(file.path()).expect("load");
        assert_eq!(styles.for_token_count(9999).as_slice(), v1.as_slice());
    }

    #[test]
    fn rejects_bad_magic() {
        let file = write_asset(b"not a numpy file at all");
        assert!(matches!(
            VoiceStyles::load(file.path()),
            Err(KokoroError::VoiceParse(_))
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        let mut bytes = npy_bytes(&[vec![0.0; STYLE_DIM]]);
        bytes.truncate(12);
        let file = write_asset(&bytes);
        assert!(matches!(
            VoiceStyles::load(file.path()),
            Err(KokoroError::VoiceParse(_))
        ));
    }

    #[test]
    fn rejects_wrong_vector_width() {
        let header = "{'descr': '<f4', 'shape': (1, 3), }\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(NPY_MAGIC);
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&[0u8; 12]); // 3 floats, not a multiple of 256
        let file = write_asset(&bytes);
        assert!(matches!(
            VoiceStyles::load(file.path()),
            Err(KokoroError::VoiceParse(_))
        ));
    }

    #[test]
    fn rejects_missing_file() {
        assert!(matches!(
            VoiceStyles::load(std::path::Path::new("/nonexistent/af_bella.npy")),
            Err(KokoroError::VoiceParse(_))
        ));
    }
}
