mod config;

use std::collections::HashMap;
use std::sync::Arc;

use nexus_blob::Local;
use nexus_cas::CasStore;
use nexus_fileservice::FileService;
use nexus_hash::Digest;
use nexus_metadata::Store as MetadataStore;
use nexus_namespace::Router as NamespaceRouter;
use nexus_rebac::{Engine as RebacEngine, NamespaceRegistry};
use nexus_rpc::AppState;
use nexus_versioning::Versioning;
use nexus_watch::Journal;

use config::Config;

/// Tenant that owns the `API_KEY`-seeded bootstrap admin. Operators create
/// further tenants' keys through `admin_create_key` once logged in.
const BOOTSTRAP_TENANT_ID: &str = "default";
const DEFAULT_BACKEND_ID: &str = "cas";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;
    let blob_dir = config.data_dir.join("blobs");

    let metadata = Arc::new(MetadataStore::new());
    let namespace_router = Arc::new(NamespaceRouter::new(metadata.clone()));
    let rebac = RebacEngine::new(metadata.clone(), Arc::new(NamespaceRegistry::new()));
    let cas_backend = Local::new(&blob_dir)?;
    let cas = Arc::new(CasStore::new(Arc::new(cas_backend), metadata.clone(), DEFAULT_BACKEND_ID));
    let versioning = Arc::new(Versioning::new(metadata.clone(), cas.clone()));

    let mut backends = HashMap::new();
    backends.insert(DEFAULT_BACKEND_ID.to_owned(), cas);
    let file_service = Arc::new(FileService::new(metadata.clone(), namespace_router, rebac.clone(), versioning.clone(), backends));

    let journal = Arc::new(Journal::with_defaults(metadata.clone()));

    bootstrap_admin_key(&metadata, config.bootstrap_api_key.as_deref());

    let state = AppState { file_service, rebac, versioning, metadata, journal };
    let app = nexus_rpc::router(state);

    tracing::info!(addr = %config.bind_addr, "starting nexus-server");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

/// Seeds the single bootstrap admin key from `API_KEY` on first start.
/// Idempotent: a restart with an existing admin key on disk is a no-op, so
/// operators can leave `API_KEY` set across restarts without minting a new
/// key (or worse, locking themselves out of the one they already have).
fn bootstrap_admin_key(metadata: &MetadataStore, api_key: Option<&str>) {
    let Some(token) = api_key else {
        tracing::warn!("no API_KEY set; no bootstrap admin key will be created");
        return;
    };
    if metadata.any_admin_key_exists() {
        return;
    }
    let hash = Digest::of(token.as_bytes()).to_hex();
    metadata.create_key(hash, true, "user".to_owned(), "root".to_owned(), BOOTSTRAP_TENANT_ID.to_owned());
    tracing::info!("bootstrap admin key created");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
