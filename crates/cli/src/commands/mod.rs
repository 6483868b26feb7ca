//! CLI subcommand implementations.

pub mod cart;
pub mod migrate;
pub mod preorders;
pub mod settings;

use sqlx::PgPool;
use thiserror::Error;

use sareine_core::PreorderError;

use sareine_storefront::config::{ConfigError, StorefrontConfig};
use sareine_storefront::db::{self, RepositoryError};
use sareine_storefront::store::StoreError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("No user document for {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Preorder(#[from] PreorderError),

    #[error("No preorder with id {0}")]
    PreorderNotFound(i64),
}

/// Connect to the storefront database named by the environment.
async fn connect() -> Result<PgPool, CommandError> {
    let config = StorefrontConfig::from_env()?;
    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&config.database_url).await?)
}
