//! Preorder endpoints.
//!
//! Capturing a preorder only records it. Staff follow up by hand and move it
//! through its statuses with `POST /api/preorder/update-status` or the CLI.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use sareine_core::{NewPreorder, Preorder, PreorderId, PreorderStatus};

use super::settings::current_settings;
use crate::db::PreorderRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreorderResponse {
    pub success: bool,
    pub preorder_id: PreorderId,
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreorderListResponse {
    pub preorders: Vec<Preorder>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub id: i64,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
}

/// `POST /api/preorder`
///
/// Rejects malformed or incomplete requests, and every request while
/// preorders are switched off.
pub async fn create_preorder(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewPreorder>, JsonRejection>,
) -> Result<Json<CreatePreorderResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let customer_email = request.validate()?;

    if !current_settings(&state).await.preorder_enabled {
        return Err(AppError::BadRequest(
            "preorders are not being accepted".to_string(),
        ));
    }

    let preorder = PreorderRepository::new(state.pool())
        .create(&request, &customer_email)
        .await?;

    info!(
        preorder_id = %preorder.preorder_id,
        user = %preorder.user_id,
        amount = %preorder.amount,
        "Preorder placed"
    );

    Ok(Json(CreatePreorderResponse {
        success: true,
        preorder_id: preorder.preorder_id,
        id: preorder.id,
    }))
}

/// `GET /api/preorder/list[?status=<status>]`
pub async fn list_preorders(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<PreorderListResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<PreorderStatus>)
        .transpose()?;

    let preorders = PreorderRepository::new(state.pool()).list(status).await?;
    Ok(Json(PreorderListResponse { preorders }))
}

/// `POST /api/preorder/update-status`
pub async fn update_preorder_status(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<UpdateStatusResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let status: PreorderStatus = request.status.parse()?;

    let preorder = PreorderRepository::new(state.pool())
        .update_status(request.id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("preorder {}", request.id)))?;

    info!(preorder_id = %preorder.preorder_id, status = %status, "Preorder status changed");
    Ok(Json(UpdateStatusResponse { success: true }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Value, json};

    use crate::routes::testing::{offline_state, serve};

    fn request() -> Value {
        json!({
            "userId": "u1",
            "items": [{"id": "rose", "name": "Rose Lip Balm", "price": 599, "quantity": 2, "slug": "rose"}],
            "amount": 1198,
            "shippingAddress": {
                "name": "Asha Rao", "phone": "+91 98450 00000", "street": "12 MG Road",
                "city": "Bengaluru", "state": "Karnataka", "zip": "560001"
            },
            "customerName": "Asha Rao",
            "customerEmail": "asha@sareine.in"
        })
    }

    async fn post(base: &str, path: &str, body: &Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{base}{path}"))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_incomplete_request_is_bad_request() {
        let base = serve(offline_state(true)).await;
        let mut body = request();
        body["shippingAddress"]["zip"] = json!("");

        let response = post(&base, "/api/preorder", &body).await;

        assert_eq!(response.status(), 400);
        assert_eq!(
            response.text().await.unwrap(),
            "Bad request: missing required field: shippingAddress.zip"
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let base = serve(offline_state(true)).await;

        let response = post(&base, "/api/preorder", &json!({"userId": 5})).await;

        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_closed_preorders_are_refused() {
        // Unreadable settings fall back to the configured flag, here off.
        let base = serve(offline_state(false)).await;

        let response = post(&base, "/api/preorder", &request()).await;

        assert_eq!(response.status(), 400);
        assert_eq!(
            response.text().await.unwrap(),
            "Bad request: preorders are not being accepted"
        );
    }

    #[tokio::test]
    async fn test_database_failure_hides_details() {
        let base = serve(offline_state(true)).await;

        let response = post(&base, "/api/preorder", &request()).await;

        assert_eq!(response.status(), 500);
        assert_eq!(response.text().await.unwrap(), "Internal server error");

        let response = reqwest::get(format!("{base}/api/preorder/list"))
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
    }

    #[tokio::test]
    async fn test_unknown_status_is_bad_request() {
        let base = serve(offline_state(true)).await;

        let response = post(
            &base,
            "/api/preorder/update-status",
            &json!({"id": 1, "status": "shipped"}),
        )
        .await;
        assert_eq!(response.status(), 400);
        assert!(
            response
                .text()
                .await
                .unwrap()
                .contains("must be one of: pending_confirmation")
        );

        let response = reqwest::get(format!("{base}/api/preorder/list?status=lost"))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }
}
