//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! sareine migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! # Migration Files
//!
//! ```text
//! crates/storefront/migrations/
//! ├── 20260301000000_create_user_document.sql
//! └── 20260301000001_create_site_settings.sql
//! ```

use super::{CommandError, connect};

/// Run storefront database migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
