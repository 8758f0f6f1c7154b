//! Ledger row models for users, referral edges, and transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TokenAmount, UserId};

/// Transaction kind string for reward payouts.
pub const REWARD_KIND: &str = "reward";

/// A user row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Ledger-assigned user id.
    pub id: UserId,
    /// Unique email address.
    pub email: String,
    /// Unique code this user hands out to refer others.
    pub referral_code: String,
    /// Linked wallet address; unset until the user links one.
    pub wallet_address: Option<String>,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
}

/// A referral edge row: `referred` was brought in by `referrer`.
///
/// One row per referred user; created once at signup, never mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReferralEdge {
    /// The referring user.
    pub referrer_id: UserId,
    /// The referred user (unique across the table).
    pub referred_id: UserId,
    /// Edge creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A core-team membership row, marking root-tier reward eligibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoreTeamMember {
    /// The eligible user.
    pub user_id: UserId,
    /// When membership was granted.
    pub granted_at: DateTime<Utc>,
}

/// Lifecycle status of a transaction row.
///
/// Reward rows are written as `Pending` intents before the gateway call
/// and reconciled afterwards; `Unknown` marks a timed-out transfer that
/// needs out-of-band reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Intent recorded, transfer not yet settled.
    Pending,
    /// Transfer confirmed by the gateway.
    Completed,
    /// Gateway reported failure; no transfer executed.
    Failed,
    /// Gateway call timed out; transfer outcome unresolved.
    Unknown,
}

impl TxStatus {
    /// Stable string form stored in the `status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// Parses the stored column value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A transaction row from the `transactions` table.
///
/// Append-only payout bookkeeping: the row is the durable evidence that a
/// gateway transfer was attempted, and its status tracks how the attempt
/// settled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Auto-increment row id.
    pub id: i64,
    /// Recipient user.
    pub user_id: UserId,
    /// Kind discriminator (e.g. [`REWARD_KIND`]).
    pub kind: String,
    /// Amount in smallest units, stored as a decimal string.
    pub amount: TokenAmount,
    /// Lifecycle status.
    pub status: TxStatus,
    /// On-chain transfer hash; set when the transfer completed. Unique
    /// per successful payout.
    pub transfer_hash: Option<String>,
    /// Intent creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Reconciliation timestamp, once the intent settled.
    pub settled_at: Option<DateTime<Utc>>,
}
