//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! - `user_document` - Per-user profile fields and the signed-in cart. A
//!   trigger announces every change on the `user_document_changed` channel.
//! - `site_settings` - Site-wide switches, one JSON value per key.
//! - `preorder` - Preorders captured from carts, with their fulfilment status.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sareine-cli -- migrate
//! ```

mod documents;
mod preorders;
mod settings;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use documents::{DOCUMENT_CHANNEL, PgDocumentStore};
pub use preorders::PreorderRepository;
pub use settings::{SITE_CONFIG_KEY, SiteSettingsRepository};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

impl From<RepositoryError> for crate::store::StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::Database(e),
            RepositoryError::DataCorruption(msg) => Self::Corrupt(msg),
        }
    }
}
