use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::api::not_found;
use crate::state::AppState;

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check).fallback(not_found))
}

/// GET /health - liveness only, the mail transport is never consulted
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}
