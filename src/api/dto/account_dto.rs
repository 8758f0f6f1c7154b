//! Account and referral DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::PaginationMeta;
use crate::service::UserProfile;
use crate::store::{TransactionRecord, UserRecord};

/// Request body for `POST /users`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Email address (unique).
    pub email: String,
    /// Referral code of the referring user, when signing up through a
    /// referral link.
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Request body for `PUT /users/{id}/wallet`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkWalletRequest {
    /// Wallet address to link.
    pub wallet_address: String,
}

/// Full user representation for profile and registration responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// Ledger user id.
    pub id: i64,
    /// Email address.
    pub email: String,
    /// This user's own referral code.
    pub referral_code: String,
    /// Linked wallet address, if any.
    pub wallet_address: Option<String>,
    /// Who referred this user, if anyone.
    pub referrer_id: Option<i64>,
    /// Whether the user is a core-team member.
    pub core_team: bool,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    /// Builds a response from a bare user record (registration path,
    /// where referrer and core-team state are already known).
    #[must_use]
    pub fn from_record(record: UserRecord, referrer_id: Option<i64>) -> Self {
        Self {
            id: record.id.get(),
            email: record.email,
            referral_code: record.referral_code,
            wallet_address: record.wallet_address,
            referrer_id,
            core_team: false,
            created_at: record.created_at,
        }
    }
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.user.id.get(),
            email: profile.user.email,
            referral_code: profile.user.referral_code,
            wallet_address: profile.user.wallet_address,
            referrer_id: profile.referrer_id.map(i64::from),
            core_team: profile.core_team,
            created_at: profile.user.created_at,
        }
    }
}

/// Compact user form used in referral-root responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummaryDto {
    /// Ledger user id.
    pub id: i64,
    /// Email address.
    pub email: String,
    /// This user's referral code.
    pub referral_code: String,
}

impl From<UserRecord> for UserSummaryDto {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id.get(),
            email: record.email,
            referral_code: record.referral_code,
        }
    }
}

/// Response body for `GET /users/{id}/referral/root`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReferralRootResponse {
    /// The chain's root ancestor, or `null` when the user has no
    /// referrer.
    pub root: Option<UserSummaryDto>,
}

/// One transaction row in list responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionDto {
    /// Transaction row id.
    pub id: i64,
    /// Kind discriminator (e.g. `"reward"`).
    pub kind: String,
    /// Amount in smallest units (string-encoded u128).
    pub amount: String,
    /// Lifecycle status.
    pub status: String,
    /// On-chain transfer hash, once completed.
    pub transfer_hash: Option<String>,
    /// Intent creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Settlement timestamp, if settled.
    pub settled_at: Option<DateTime<Utc>>,
}

impl From<TransactionRecord> for TransactionDto {
    fn from(record: TransactionRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            amount: record.amount.to_string(),
            status: record.status.as_str().to_string(),
            transfer_hash: record.transfer_hash,
            created_at: record.created_at,
            settled_at: record.settled_at,
        }
    }
}

/// Response body for `GET /users/{id}/transactions`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListResponse {
    /// Page of transactions, newest first.
    pub data: Vec<TransactionDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
