//! Site settings endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use tracing::error;

use sareine_core::{SiteSettings, SiteSettingsResponse};

use crate::db::SiteSettingsRepository;
use crate::state::AppState;

/// `GET /api/site-settings`
///
/// Never fails: settings that were never saved read as defaults, and a
/// database error serves defaults with the configured preorder fallback.
pub async fn site_settings(State(state): State<AppState>) -> impl IntoResponse {
    let settings = current_settings(&state).await;

    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(SiteSettingsResponse { settings }),
    )
}

/// Stored settings, defaults if never saved, or defaults with the configured
/// preorder fallback if the database cannot be read.
pub(crate) async fn current_settings(state: &AppState) -> SiteSettings {
    match SiteSettingsRepository::new(state.pool()).get().await {
        Ok(Some(settings)) => settings,
        Ok(None) => SiteSettings::default(),
        Err(e) => {
            error!(error = %e, "Failed to read site settings, serving defaults");
            SiteSettings::with_preorder_fallback(state.config().preorder_fallback)
        }
    }
}
