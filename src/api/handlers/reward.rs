//! Reward distribution endpoint handler.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{DistributeRequest, DistributionResponse};
use crate::app_state::AppState;
use crate::domain::{TokenAmount, UserId};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /users/{id}/rewards` — Distribute referral rewards.
///
/// Settles the direct (10%) and root (2.5%) tiers independently and
/// reports each tier's outcome. The response is `200` when the direct
/// tier paid (whatever happened to the root tier) and `502` with the
/// same per-tier body when the direct transfer failed at the gateway.
///
/// # Errors
///
/// Returns [`ServiceError`] when the user has no referrer, the referrer
/// has no wallet, the value is malformed, or the idempotency key was
/// already claimed.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/rewards",
    tag = "Rewards",
    summary = "Distribute referral rewards",
    description = "Runs the two-tier reward distribution for the referred user: 10% of the gross value to the direct referrer, and 2.5% to the chain's root ancestor when that root is a core-team member. Tiers settle independently; each outcome is reported separately.",
    params(
        ("id" = i64, Path, description = "Referred user id"),
    ),
    request_body = DistributeRequest,
    responses(
        (status = 200, description = "Distribution settled (per-tier outcomes in body)", body = DistributionResponse),
        (status = 400, description = "Malformed value or referrer wallet missing", body = ErrorResponse),
        (status = 404, description = "User has no referrer", body = ErrorResponse),
        (status = 409, description = "Payout already claimed for this source event", body = ErrorResponse),
        (status = 502, description = "Direct-tier transfer failed (per-tier outcomes in body)", body = DistributionResponse),
    )
)]
pub async fn distribute(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<DistributeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let referred = UserId::new(id);
    let gross: TokenAmount = req
        .value
        .parse()
        .map_err(|_| ServiceError::InvalidRequest(format!("invalid value: {}", req.value)))?;

    let outcome = state
        .reward_service
        .distribute(referred, gross, req.source_event_id)
        .await?;

    // A direct-tier gateway failure is a 502 for the caller, but the
    // body still carries both tier outcomes for reconciliation.
    let status = if outcome.direct.is_failed() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(DistributionResponse {
            referred_id: referred.get(),
            gross_value: gross.to_string(),
            direct: outcome.direct,
            root: outcome.root,
            distributed_at: Utc::now(),
        }),
    ))
}

/// Reward routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/users/{id}/rewards", post(distribute))
}
