//! Reward distribution DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::TierOutcome;

/// Request body for `POST /users/{id}/rewards`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DistributeRequest {
    /// Gross value in the token's smallest unit (string-encoded u128).
    pub value: String,
    /// Caller-supplied idempotency key for this logical payout. Replays
    /// with the same key are rejected instead of double-paying.
    pub source_event_id: Uuid,
}

/// Response body for `POST /users/{id}/rewards`.
///
/// Both tiers are reported individually so the caller can distinguish
/// "direct paid, root failed" from total failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct DistributionResponse {
    /// The referred user the distribution ran for.
    pub referred_id: i64,
    /// Gross value the split was computed from (string-encoded u128).
    pub gross_value: String,
    /// Direct-tier (10%) outcome.
    pub direct: TierOutcome,
    /// Root-tier (2.5%) outcome.
    pub root: TierOutcome,
    /// Settlement timestamp.
    pub distributed_at: DateTime<Utc>,
}
