//! Site settings repository.

use sqlx::PgPool;
use sqlx::types::Json;

use sareine_core::SiteSettings;

use super::RepositoryError;

/// Row key holding the storefront settings.
pub const SITE_CONFIG_KEY: &str = "site_config";

/// Repository for `storefront.site_settings`.
pub struct SiteSettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SiteSettingsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read the storefront settings. `None` if they were never saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails or the stored
    /// value is not a settings object.
    pub async fn get(&self) -> Result<Option<SiteSettings>, RepositoryError> {
        let value: Option<Json<SiteSettings>> =
            sqlx::query_scalar("SELECT value FROM storefront.site_settings WHERE key = $1")
                .bind(SITE_CONFIG_KEY)
                .fetch_optional(self.pool)
                .await?;

        Ok(value.map(|Json(settings)| settings))
    }

    /// Replace the storefront settings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, settings: &SiteSettings) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.site_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = NOW()
            ",
        )
        .bind(SITE_CONFIG_KEY)
        .bind(Json(settings))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
