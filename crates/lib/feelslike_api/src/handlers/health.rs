//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health` — reports the running version.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: feelslike_core::version().into(),
    })
}
