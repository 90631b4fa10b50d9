//! Front ends over the query pipeline: HTTP server, one-shot query CLI and
//! the chunk indexer.

use micarag_core::config::{Config, RagSettings};
use tracing_subscriber::EnvFilter;

pub mod indexer;
pub mod server;

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// `.env`, then config files and environment, validated.
pub fn load_settings() -> anyhow::Result<RagSettings> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    Ok(config.settings()?)
}
