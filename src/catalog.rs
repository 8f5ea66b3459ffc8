//! Voice catalog: discovery, language grouping, and the dependent-dropdown
//! selection logic.
//!
//! Voice assets live as one `.npy` style-vector file per voice under
//! `{root}/voices/`. The identifier is the filename with the extension
//! stripped, and its first character is the language code (`af_bella` is an
//! American English voice).

use std::path::{Path, PathBuf};

use serde::Serialize;

/// File extension of voice asset files.
const VOICE_EXT: &str = "npy";

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("I/O error reading voices directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("No voice files (*.{VOICE_EXT}) found in {0:?}")]
    EmptyCatalog(PathBuf),
    #[error("No voices available for language code '{0}'")]
    NoVoicesForLanguage(char),
}

/// A language entry for the UI dropdown.
#[derive(Debug, Clone, Serialize)]
pub struct Language {
    pub code: char,
    pub label: String,
}

/// Dropdown state after a language change: the filtered choices plus the
/// value to select (the first choice in sorted order).
#[derive(Debug, Clone, Serialize)]
pub struct VoiceSelection {
    pub choices: Vec<String>,
    pub value: String,
}

/// The set of voices discovered at startup, immutable afterwards.
pub struct VoiceCatalog {
    voices_dir: PathBuf,
    voices: Vec<String>,
    languages: Vec<Language>,
}

impl VoiceCatalog {
    /// Scan `{root}/voices` for voice assets.
    ///
    /// Fails fast when the directory is missing or contains no voice files;
    /// an empty catalog would only surface later as an unusable UI.
    pub fn scan(root: &Path) -> Result<Self, CatalogError> {
        let voices_dir = root.join("voices");

        let mut voices = Vec::new();
        for entry in std::fs::read_dir(&voices_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VOICE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                voices.push(stem.to_string());
            }
        }
        if voices.is_empty() {
            return Err(CatalogError::EmptyCatalog(voices_dir));
        }
        voices.sort_unstable();

        let languages = group_language_codes(&voices)
            .into_iter()
            .map(|code| Language {
                code,
                label: language_label(code),
            })
            .collect();

        log::info!("Discovered {} voices in {}", voices.len(), voices_dir.display());
        Ok(Self {
            voices_dir,
            voices,
            languages,
        })
    }

    /// All voice identifiers, sorted.
    pub fn voices(&self) -> &[String] {
        &self.voices
    }

    /// Languages present in the catalog, in first-seen order over the sorted
    /// voice list.
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Whether `voice` was discovered during the startup scan.
    pub fn contains(&self, voice: &str) -> bool {
        self.voices.binary_search_by(|v| v.as_str().cmp(voice)).is_ok()
    }

    /// Path to the asset file backing `voice`.
    pub fn voice_path(&self, voice: &str) -> PathBuf {
        self.voices_dir.join(format!("{voice}.{VOICE_EXT}"))
    }

    /// The default language: the first one discovered.
    pub fn default_language(&self) -> char {
        self.languages[0].code
    }

    /// Recompute the voice dropdown for a language change.
    ///
    /// Returns the catalog subset whose identifiers start with `code`, with
    /// the first entry as the new value. A code with no matching voices is an
    /// error rather than a panic on an empty list.
    pub fn voices_for_language(&self, code: char) -> Result<VoiceSelection, CatalogError> {
        let choices: Vec<String> = self
            .voices
            .iter()
            .filter(|v| v.starts_with(code))
            .cloned()
            .collect();
        let value = choices
            .first()
            .cloned()
            .ok_or(CatalogError::NoVoicesForLanguage(code))?;
        Ok(VoiceSelection { choices, value })
    }
}

/// Language codes present in `voices`, keeping first-seen order.
fn group_language_codes(voices: &[String]) -> Vec<char> {
    let mut codes = Vec::new();
    for voice in voices {
        if let Some(code) = voice.chars().next() {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}

/// Human-readable name for a language code. Codes missing from the table
/// fall back to the code itself.
fn language_label(code: char) -> String {
    let label = match code {
        'a' => "English (US)",
        'b' => "English (UK)",
        'c' => "German",
        'e' => "Spanish",
        'f' => "French",
        'h' => "Hindi",
        'i' => "Italian",
        'j' => "Japanese",
        'p' => "Brazilian Portuguese",
        'z' => "Mandarin Chinese",
        _ => return code.to_string(),
    };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn catalog_with(voices: &[&str]) -> VoiceCatalog {
        let dir = tempfile::tempdir().expect("tempdir");
        let voices_dir = dir.path().join("voices");
        std::fs::create_dir(&voices_dir).expect("create voices dir");
        for voice in voices {
            File::create(voices_dir.join(format!("{voice}.npy"))).expect("create voice file");
        }
        // Leak the tempdir so the catalog outlives it in tests.
        let catalog = VoiceCatalog::scan(dir.path()).expect("scan");
        std::mem::forget(dir);
        catalog
    }

    #[test]
    fn lists_voices_sorted_with_extension_stripped() {
        let catalog = catalog_with(&["bf_emma", "af_sky", "af_bella"]);
        assert_eq!(catalog.voices(), ["af_bella", "af_sky", "bf_emma"]);
    }

    #[test]
    fn groups_language_codes_in_first_seen_order() {
        let catalog = catalog_with(&["af_bella", "af_sky", "bf_emma"]);
        let codes: Vec<char> = catalog.languages().iter().map(|l| l.code).collect();
        assert_eq!(codes, ['a', 'b']);
        assert_eq!(catalog.default_language(), 'a');
    }

    #[test]
    fn every_voice_starts_with_a_grouped_code() {
        let catalog = catalog_with(&["af_bella", "bf_emma", "jf_alpha", "zf_xiaobei"]);
        let codes: Vec<char> = catalog.languages().iter().map(|l| l.code).collect();
        for voice in catalog.voices() {
            let first = voice.chars().next().unwrap();
            assert!(codes.contains(&first), "{voice} has unlisted code {first}");
        }
    }

    #[test]
    fn language_change_filters_choices_and_picks_first() {
        let catalog = catalog_with(&["af_bella", "af_sky", "bf_emma"]);
        let selection = catalog.voices_for_language('b').expect("selection");
        assert_eq!(selection.choices, ["bf_emma"]);
        assert_eq!(selection.value, "bf_emma");

        let selection = catalog.voices_for_language('a').expect("selection");
        assert_eq!(selection.choices, ["af_bella", "af_sky"]);
        assert_eq!(selection.value, "af_bella");
    }

    #[test]
    fn language_without_voices_is_an_error() {
        let catalog = catalog_with(&["af_bella"]);
        assert!(matches!(
            catalog.voices_for_language('z'),
            Err(CatalogError::NoVoicesForLanguage('z'))
        ));
    }

    #[test]
    fn unknown_language_code_falls_back_to_itself() {
        let catalog = catalog_with(&["qf_mystery"]);
        assert_eq!(catalog.languages()[0].label, "q");
    }

    #[test]
    fn known_language_codes_get_display_names() {
        let catalog = catalog_with(&["af_bella", "zf_xiaobei"]);
        let labels: Vec<&str> = catalog.languages().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["English (US)", "Mandarin Chinese"]);
    }

    #[test]
    fn empty_voices_dir_fails_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("voices")).expect("create voices dir");
        assert!(matches!(
            VoiceCatalog::scan(dir.path()),
            Err(CatalogError::EmptyCatalog(_))
        ));
    }

    #[test]
    fn missing_voices_dir_fails_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(VoiceCatalog::scan(dir.path()), Err(CatalogError::Io(_))));
    }

    #[test]
    fn non_voice_files_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let voices_dir = dir.path().join("voices");
        std::fs::create_dir(&voices_dir).expect("create voices dir");
        File::create(voices_dir.join("af_bella.npy")).expect("voice file");
        File::create(voices_dir.join("README.md")).expect("stray file");
        let catalog = VoiceCatalog::scan(dir.path()).expect("scan");
        assert_eq!(catalog.voices(), ["af_bella"]);
    }

    #[test]
    fn membership_and_asset_paths() {
        let catalog = catalog_with(&["af_bella", "bf_emma"]);
        assert!(catalog.contains("af_bella"));
        assert!(!catalog.contains("af_nicole"));
        assert!(catalog
            .voice_path("af_bella")
            .ends_with("voices/af_bella.npy"));
    }
}
