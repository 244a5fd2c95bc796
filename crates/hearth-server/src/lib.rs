//! Hearth Server
//!
//! HTTP surface of the neighborhood connection graph: sessions, connection
//! lifecycle, listings, recommendations and discovery.

#![warn(missing_docs)]

pub mod config;
pub mod dto;
pub mod handlers;
pub mod session;

use config::ServerConfig;
use handlers::{create_router, AppState};
use hearth_engine::{ConnectionEngine, EngineError};
use hearth_store::{ResidentRegistry, SqliteStore, StoreError};
use session::SessionManager;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::info;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Edge store could not be opened
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Engine rejected its configuration
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Open the store, seed the directory and assemble the shared state
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    config.validate()?;

    let store = SqliteStore::new(&config.database_path)?;
    let registry = ResidentRegistry::from_residents(config.seed_residents()?);

    let engine = ConnectionEngine::new(
        Arc::new(Mutex::new(store)),
        Arc::new(registry),
        config.engine.clone(),
    )?;

    let session_manager = Arc::new(SessionManager::new(
        &config.jwt_secret,
        config.token_expiry_secs,
    ));

    Ok(AppState {
        engine: Arc::new(engine),
        session_manager,
    })
}

/// Start the HTTP server
///
/// Builds the shared state from configuration and serves until the
/// listener fails.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Hearth server");
    info!("Bind address: {}", config.bind_addr());
    info!("Database: {}", config.database_path);
    info!("Token expiry: {} seconds", config.token_expiry_secs);
    info!("Seeded residents: {}", config.residents.len());

    let state = build_state(&config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
