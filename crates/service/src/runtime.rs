//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` to keep the server crate importing
//! `service::runtime::ensure_env` without depending directly on `common`.

use std::path::Path;

/// Ensure the store's directory exists; warn when the static directory is missing.
pub async fn ensure_env(static_dir: Option<&str>, store_path: &Path) -> anyhow::Result<()> {
    let data_dir = store_path.parent().unwrap_or_else(|| Path::new(""));
    common::env::ensure_env(static_dir, data_dir).await
}
