//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
}

/// GET /api/health: returns system health status.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok",
    })
}
