use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use kokoro_ui::catalog::VoiceCatalog;
use kokoro_ui::kokoro::KokoroModel;
use kokoro_ui::server::{create_router, AppState};

/// Model root directory, fixed like the original deployment layout.
const KOKORO_PATH: &str = "Kokoro-82M";

/// Requests and model lifecycle events land here.
const LOG_FILE: &str = "kokoro-ui.log";

/// Same local port gradio would have used.
const BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 7860);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    log::info!("Launching Kokoro UI…");

    let root = PathBuf::from(KOKORO_PATH);
    let catalog = Arc::new(VoiceCatalog::scan(&root)?);
    let model = Arc::new(KokoroModel::load(&root)?);

    let state = AppState::new(model, catalog);
    let app = create_router(state);

    let addr = SocketAddr::from(BIND_ADDR);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{addr}");
    println!("Kokoro UI running on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shutdown complete");
    Ok(())
}

/// Log to a fixed local file, INFO by default; RUST_LOG still overrides.
fn init_logging() -> std::io::Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down"),
        _ = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}
