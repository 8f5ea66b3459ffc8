//! HTTP surface: the single-page UI plus the JSON API behind it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::catalog::{CatalogError, Language, VoiceCatalog, VoiceSelection};
use crate::kokoro::{KokoroError, KokoroModel};
use crate::SynthesisRequest;

static INDEX_HTML: &str = include_str!("../assets/index.html");

/// Generated artifacts by file name. Lookup is exact-match only, so the
/// audio route can never serve anything this process didn't create.
#[derive(Default)]
pub struct ArtifactStore {
    files: Mutex<HashMap<String, PathBuf>>,
}

impl ArtifactStore {
    /// Register an artifact and return the name it is served under.
    pub fn register(&self, path: PathBuf) -> Option<String> {
        let name = path.file_name()?.to_str()?.to_string();
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), path);
        Some(name)
    }

    pub fn get(&self, name: &str) -> Option<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// Shared application state: the model handle, the startup catalog, and the
/// artifact registry.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<KokoroModel>,
    pub catalog: Arc<VoiceCatalog>,
    pub artifacts: Arc<ArtifactStore>,
}

impl AppState {
    pub fn new(model: Arc<KokoroModel>, catalog: Arc<VoiceCatalog>) -> Self {
        Self {
            model,
            catalog,
            artifacts: Arc::new(ArtifactStore::default()),
        }
    }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/catalog", get(get_catalog))
        .route("/api/voices/:code", get(get_voices))
        .route("/api/synthesize", post(synthesize))
        .route("/api/audio/:name", get(get_audio))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct CatalogResponse<'a> {
    languages: &'a [Language],
    default_language: char,
    voices: VoiceSelection,
}

/// Initial UI state: languages, default language, and the voice dropdown
/// for the default language.
async fn get_catalog(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let default_language = state.catalog.default_language();
    let voices = state
        .catalog
        .voices_for_language(default_language)
        .map_err(|e| {
            log::error!("Catalog inconsistency: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let body = serde_json::to_value(CatalogResponse {
        languages: state.catalog.languages(),
        default_language,
        voices,
    })
    .map_err(|e| {
        log::error!("Catalog serialization failed: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(body))
}

/// Selection controller: recompute the voice dropdown for a language change.
async fn get_voices(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<VoiceSelection>, StatusCode> {
    let code = code.chars().next().ok_or(StatusCode::BAD_REQUEST)?;
    log::info!("Language changed to {code}");

    match state.catalog.voices_for_language(code) {
        Ok(selection) => {
            log::info!("New voices: {:?}", selection.choices);
            Ok(Json(selection))
        }
        Err(CatalogError::NoVoicesForLanguage(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            log::error!("Voice lookup failed: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Serialize)]
struct SynthesizeResponse {
    /// URL of the generated audio, under `/api/audio/`.
    audio: String,
    frames: u64,
}

/// Run one synthesis request on a blocking worker and register the artifact.
async fn synthesize(
    State(state): State<AppState>,
    Json(request): Json<SynthesisRequest>,
) -> Result<Json<SynthesizeResponse>, StatusCode> {
    let model = state.model.clone();
    let catalog = state.catalog.clone();

    let result = tokio::task::spawn_blocking(move || {
        crate::synthesize(&model, &catalog, &request)
    })
    .await
    .map_err(|e| {
        log::error!("Synthesis task failed to run: {e}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let artifact = match result {
        Ok(artifact) => artifact,
        Err(KokoroError::VoiceNotFound(voice)) => {
            log::warn!("Unknown voice requested: {voice}");
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            log::error!("Synthesis failed: {e}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let name = state.artifacts.register(artifact.path).ok_or_else(|| {
        log::error!("Artifact path has no usable file name");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(SynthesizeResponse {
        audio: format!("/api/audio/{name}"),
        frames: artifact.frames,
    }))
}

/// Serve a previously generated WAV from the artifact registry.
async fn get_audio(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let path = state.artifacts.get(&name).ok_or(StatusCode::NOT_FOUND)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        log::error!("Cannot read artifact {}: {e}", path.display());
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes))
}
