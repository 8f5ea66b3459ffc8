//! Phoneme vocabulary loading.

use std::collections::HashMap;
use std::path::Path;

use super::model::KokoroError;

/// Load the Kokoro vocabulary from the model's config.json.
///
/// The file must contain a `"vocab"` object mapping single-character strings
/// (IPA symbols and punctuation) to integer token IDs.
pub fn load_vocab(config_path: &Path) -> Result<HashMap<char, i64>, KokoroError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        KokoroError::Config(format!("cannot read {}: {e}", config_path.display()))
    })?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| KokoroError::Config(format!("invalid JSON: {e}")))?;

    let vocab_obj = json
        .get("vocab")
        .and_then(|v| v.as_object())
        .ok_or_else(|| KokoroError::Config("missing 'vocab' object".to_string()))?;

    let mut map = HashMap::with_capacity(vocab_obj.len());
    for (key, value) in vocab_obj {
        let mut chars = key.chars();
        let ch = chars
            .next()
            .ok_or_else(|| KokoroError::Config("empty vocab key".to_string()))?;
        if chars.next().is_some() {
            return Err(KokoroError::Config(format!(
                "multi-character vocab key {key:?}"
            )));
        }
        let id = value.as_i64().ok_or_else(|| {
            KokoroError::Config(format!("non-integer vocab value for key {key:?}"))
        })?;
        map.insert(ch, id);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp config");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn loads_vocab_entries() {
        let file = write_config(r#"{"vocab": {"a": 43, ".": 4, "ə": 83}}"#);
        let vocab = load_vocab(file.path()).expect("load");
        assert_eq!(vocab.get(&'a'), Some(&43));
        assert_eq!(vocab.get(&'.'), Some(&4));
        assert_eq!(vocab.get(&'ə'), Some(&83));
    }

    #[test]
    fn missing_vocab_field_is_an_error() {
        let file = write_config(r#"{"sample_rate": 24000}"#);
        assert!(matches!(
            load_vocab(file.path()),
            Err(KokoroError::Config(_))
        ));
    }

    #[test]
    fn multi_character_key_is_an_error() {
        let file = write_config(r#"{"vocab": {"ab": 1}}"#);
        assert!(matches!(
            load_vocab(file.path()),
            Err(KokoroError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(matches!(
            load_vocab(std::path::Path::new("/nonexistent/config.json")),
            Err(KokoroError::Config(_))
        ));
    }
}
