//! Keeper server entry point.
//!
//! Loads configuration from the environment, opens the storage backend and
//! object store, then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use keeper_core::FieldCipher;
use keeper_storage::{FsObjectStore, MemoryBackend, MemoryObjectStore, ObjectStore};
use tokio::net::TcpListener;
use tracing::info;

use keeper_server::config::{ObjectStoreType, ServerConfig, StorageBackendType};
use keeper_server::routes::{HttpLimits, build_router};
use keeper_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        storage = ?config.storage_backend,
        objects = ?config.object_store,
        "Keeper starting"
    );

    let state = build_app_state(&config).await?;
    let app = build_router(state, HttpLimits::from(&config));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Keeper server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Keeper server stopped");
    Ok(())
}

/// Open the stores named by the configuration and build the shared state.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let objects: Arc<dyn ObjectStore> = match &config.object_store {
        ObjectStoreType::Memory => {
            info!("using in-memory object store (files will not persist)");
            Arc::new(MemoryObjectStore::new())
        }
        ObjectStoreType::Filesystem { root } => {
            info!(root = %root.display(), "using filesystem object store");
            Arc::new(
                FsObjectStore::open(root)
                    .await
                    .context("failed to open object store")?,
            )
        }
    };

    let cipher = FieldCipher::with_iv_policy(&config.cipher_key, config.iv_policy)
        .context("KEEPER_CIPHER_KEY is not a usable AES key")?;
    info!(iv_policy = ?cipher.iv_policy(), "field cipher ready");

    let state = match &config.storage_backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            AppState::new(MemoryBackend::new(), objects, cipher, &config.sign_key)
        }
        #[cfg(feature = "postgres-backend")]
        StorageBackendType::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL storage");
            let backend = keeper_storage::PostgresBackend::connect(url)
                .await
                .context("failed to connect to PostgreSQL")?;
            AppState::new(backend, objects, cipher, &config.sign_key)
        }
        #[cfg(not(feature = "postgres-backend"))]
        StorageBackendType::Postgres { .. } => {
            anyhow::bail!(
                "PostgreSQL backend requested but feature 'postgres-backend' is not enabled"
            );
        }
    };

    Ok(Arc::new(state))
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
