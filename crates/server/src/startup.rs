use axum::Router;
use configs::{AppConfig, ServerConfig};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::errors::StartupError;
use crate::routes::{self, ServerState};
use service::{products::ProductService, runtime, storage::JsonCollectionStore};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Bind `host:port`; `host` may be a hostname, an IPv4 or a bare IPv6 address.
async fn bind_listener(server: &ServerConfig) -> Result<TcpListener, StartupError> {
    TcpListener::bind((server.host.as_str(), server.port))
        .await
        .map_err(|source| StartupError::Bind { addr: format!("{}:{}", server.host, server.port), source })
}

/// Build the store, the product service and the router from config.
/// The store is warmed here; a corrupt file is logged and every request
/// retries the load until it is repaired.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    runtime::ensure_env(cfg.server.static_dir.as_deref(), &cfg.store.path).await?;

    let store = JsonCollectionStore::new(cfg.store.path.clone(), cfg.store.collection.clone());
    match store.warm().await {
        Ok(count) => info!(path = %store.path().display(), count, "product store ready"),
        Err(e) => error!(path = %store.path().display(), error = %e, "product store unavailable; requests will retry"),
    }

    let state = ServerState { products: ProductService::new(store) };
    Ok(routes::build_router(state, build_cors(), cfg.server.static_dir.as_deref()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("received Ctrl+C, shutting down");
}

/// Public entry: build the app and serve until Ctrl+C
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let listener = bind_listener(&cfg.server).await?;
    let addr = listener.local_addr()?;
    info!(%addr, host = %cfg.server.host, "starting product api");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
