//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check (served by the binary)
//! GET  /health/ready           - Database check (served by the binary)
//! GET  /api/site-settings      - Site-wide switches for every client
//! POST /api/preorder           - Capture a preorder (400 while closed)
//! GET  /api/preorder/list      - All preorders, newest first
//! POST /api/preorder/update-status - Move a preorder to another status
//! ```
//!
//! Unknown paths answer 404 through [`AppError::NotFound`].

pub mod preorders;
pub mod settings;

use axum::{
    Router,
    http::Uri,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Create the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/site-settings", get(settings::site_settings))
        .route("/api/preorder", post(preorders::create_preorder))
        .route("/api/preorder/list", get(preorders::list_preorders))
        .route(
            "/api/preorder/update-status",
            post(preorders::update_preorder_status),
        )
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    use std::time::Duration;

    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    use super::routes;
    use crate::config::StorefrontConfig;
    use crate::state::AppState;

    /// State whose database is unreachable.
    pub fn offline_state(preorder_fallback: bool) -> AppState {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://sareine@127.0.0.1:1/sareine")
            .unwrap();
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://sareine@127.0.0.1:1/sareine"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            preorder_fallback,
            sentry_dsn: None,
            sentry_environment: None,
        };
        AppState::new(config, pool)
    }

    pub async fn serve(state: AppState) -> String {
        let app = routes().with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{addr}")
    }
}
