//! HTTP server bootstrap for the energy ledger.
//!
//! This module wires together:
//! - configuration
//! - the storage backend (SQLite or in-memory)
//! - engine services (ingestion, batching, proofs, anchoring)
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::anchor::{AnchorConfig, AnchorLifecycle, AnchorSimulator};
use crate::infra::{
    BatchAssembler, FlushGate, InMemoryLogStore, LogIngestor, LogStore, ProofService,
    SqliteLogStore,
};

/// Where logs and batches are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local, lost on restart
    Memory,
    /// SQLite database at the given sqlx URL
    Sqlite(String),
}

impl StorageBackend {
    pub fn parse(url: &str) -> anyhow::Result<Self> {
        let url = url.trim();
        if url.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite(url.to_string()))
        } else {
            anyhow::bail!("Unsupported DATABASE_URL {url:?}: expected `memory` or `sqlite:...`")
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Maximum database connections.
    pub max_connections: u32,
    /// Apply embedded migrations before serving.
    pub migrate_on_startup: bool,
    pub anchor: AnchorConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://kwh_ledger.db?mode=rwc".to_string());
        let storage = StorageBackend::parse(&database_url)?;

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("Invalid listen address {host}:{port}"))?;

        let max_connections: u32 = std::env::var("MAX_DB_CONNECTIONS")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5);

        let migrate_on_startup = std::env::var("DB_MIGRATE_ON_STARTUP")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Ok(Self {
            storage,
            listen_addr,
            max_connections,
            migrate_on_startup,
            anchor: AnchorConfig::from_env(),
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub ingestor: LogIngestor,
    pub assembler: BatchAssembler,
    pub proofs: ProofService,
    pub anchors: AnchorLifecycle,
    pub simulator: Arc<AnchorSimulator>,
}

impl AppState {
    /// Wire every service over one store and one flush gate.
    pub fn new(store: Arc<dyn LogStore>, anchor: &AnchorConfig) -> Self {
        let gate = FlushGate::new();
        let anchors = AnchorLifecycle::new(store.clone(), anchor.policy);
        let simulator = Arc::new(AnchorSimulator::new(
            anchors.clone(),
            anchor.sim_start_height,
        ));

        Self {
            ingestor: LogIngestor::new(store.clone(), gate.clone()),
            assembler: BatchAssembler::new(store.clone(), gate),
            proofs: ProofService::new(store.clone()),
            anchors,
            simulator,
            store,
        }
    }
}

/// Open the configured storage backend.
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn LogStore>> {
    match &config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryLogStore::new()))
        }
        StorageBackend::Sqlite(url) => {
            let store = SqliteLogStore::from_url(url, config.max_connections)
                .await
                .with_context(|| format!("Failed to open {url}"))?;
            if config.migrate_on_startup {
                store.initialize().await?;
                info!("Database migrations applied");
            }
            Ok(Arc::new(store))
        }
    }
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting kwh-ledger v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        storage = ?config.storage,
        anchor_policy = ?config.anchor.policy,
        "Loaded configuration"
    );

    let store = connect_store(&config).await?;
    let state = AppState::new(store, &config.anchor);

    let app = build_router(state)?;

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    info!("kwh-ledger is ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the full application router over `state`.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .nest("/api", crate::api::router())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http());

    if let Some(cors_layer) = cors_layer_from_env()? {
        router = router.layer(cors_layer);
    }

    Ok(router.with_state(state))
}

fn cors_layer_from_env() -> anyhow::Result<Option<CorsLayer>> {
    let origins = match std::env::var("CORS_ALLOW_ORIGINS") {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };

    let origins = origins.trim();
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin {s:?}: {e}"))
            })
            .collect::<anyhow::Result<_>>()?;
        AllowOrigin::list(origins)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]),
    ))
}

/// Health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "service": "kwh-ledger",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check endpoint.
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, (axum::http::StatusCode, String)> {
    match state.store.ping().await {
        Ok(()) => Ok(axum::Json(serde_json::json!({
            "status": "ready",
            "database": "connected",
        }))),
        Err(e) => Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            format!("Database unavailable: {}", e),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(StorageBackend::parse("memory").unwrap(), StorageBackend::Memory);
        assert_eq!(
            StorageBackend::parse("sqlite::memory:").unwrap(),
            StorageBackend::Sqlite("sqlite::memory:".into())
        );
        assert!(StorageBackend::parse("postgres://localhost/db").is_err());
    }
}
