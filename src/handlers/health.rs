use axum::{extract::State, http::StatusCode, Json};
use tracing::debug;

use crate::models::{ErrorResponse, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse::ok("Server is running"))
}

/// Readiness check endpoint: ready once the cache tier answers
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Readiness check requested");
    if state.store.is_ready().await {
        Ok(Json(HealthResponse::ok("Service is ready")))
    } else {
        Err(ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, "cache tier unavailable"))
    }
}
