pub mod api;
pub mod authorization;
pub mod config;
pub mod core_state;
pub mod db;
pub mod diagnosis;
pub mod models;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};
use crate::core_state::{CoreError, CoreState};
use crate::db::DatabaseError;
use crate::diagnosis::{CatalogError, DiseaseCatalog};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot create data directory: {0}")]
    DataDir(#[from] std::io::Error),
    #[error("Disease catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("{0}")]
    Server(String),
}

fn load_catalog(config: &ServerConfig) -> Result<DiseaseCatalog, CatalogError> {
    match &config.disease_catalog {
        Some(path) => DiseaseCatalog::from_json_file(path),
        None => DiseaseCatalog::builtin(),
    }
}

/// Sessions live in memory, so each start hands out one token to the
/// configured operator account.
fn issue_startup_token(
    core: &CoreState,
    conn: &rusqlite::Connection,
    username: &str,
) -> Result<(), StartupError> {
    match db::find_user_by_username(conn, username)? {
        Some(user) if user.is_active => {
            let token = core.issue_token(user.id)?;
            tracing::warn!(user_id = user.id, username, "Startup bearer token: {token}");
        }
        Some(_) => tracing::warn!(username, "Startup token user is inactive; no token issued"),
        None => tracing::warn!(username, "Startup token user not found; no token issued"),
    }
    Ok(())
}

/// Start the MDT service and block until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let catalog = load_catalog(&config)?;
    tracing::info!(profiles = catalog.len(), "Disease catalog loaded");

    let core = Arc::new(CoreState::new(config.database_path(), catalog));
    {
        let conn = core.open_db()?;
        if let Some(user_id) = db::seed_defaults(&conn)? {
            tracing::info!(user_id, "Fresh database seeded");
        }
        issue_startup_token(&core, &conn, &config.token_user)?;
    }
    tracing::info!(db = %config.database_path().display(), "Database ready");

    let mut server = api::start_api_server(core, config.bind_addr)
        .await
        .map_err(StartupError::Server)?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}
