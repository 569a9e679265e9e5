//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use std::path::Path;

use tracing::{debug, warn};

/// Ensure the data directory exists; warn when an optional static directory is missing.
pub async fn ensure_env(static_dir: Option<&str>, data_dir: &Path) -> anyhow::Result<()> {
    if let Some(static_dir) = static_dir {
        if tokio::fs::metadata(static_dir).await.is_err() {
            warn!(%static_dir, "static assets directory not found; static assets may 404");
        }
    }
    if data_dir.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", data_dir.display()))?;
    debug!(data_dir = %data_dir.display(), "data directory ready");
    Ok(())
}
