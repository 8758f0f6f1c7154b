//! System endpoints: health check and reward policy introspection.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::RewardPolicy;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /config/reward-policy` — Active reward split policy.
#[utoipa::path(
    get,
    path = "/config/reward-policy",
    tag = "System",
    summary = "Show reward policy",
    description = "Returns the active tier shares in basis points and the single-level root eligibility switch, so callers can verify the split arithmetic the gateway applies.",
    responses(
        (status = 200, description = "Active policy", body = RewardPolicy),
    )
)]
pub async fn reward_policy_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(*state.reward_service.policy()))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/reward-policy", get(reward_policy_handler))
}
