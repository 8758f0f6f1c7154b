//! Per-tier reward distribution outcomes.
//!
//! A distribution request settles each tier independently; the outcome of
//! one tier never invalidates the other. [`DistributionOutcome`] is what
//! the engine hands back to the API layer, which reports both tiers to the
//! caller instead of collapsing them into a blanket success flag.

use serde::Serialize;
use utoipa::ToSchema;

use super::TokenAmount;

/// Why a tier was skipped without attempting a transfer.
///
/// Skips are normal control flow, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The referral chain has no root ancestor above the direct referrer
    /// (under the active single-level policy).
    NoRootAncestor,
    /// The resolved root is not a core-team member.
    RootNotCoreTeam,
}

/// Outcome of one reward tier within a distribution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TierOutcome {
    /// Transfer executed and recorded.
    Paid {
        /// Ledger transaction row id.
        transaction_id: i64,
        /// On-chain transfer hash returned by the gateway.
        transfer_hash: String,
        /// Amount paid, in smallest units.
        #[schema(value_type = String)]
        amount: TokenAmount,
    },
    /// Transfer was attempted and the gateway reported failure.
    Failed {
        /// Ledger transaction row id of the failed intent, when one was
        /// recorded before the attempt.
        transaction_id: Option<i64>,
        /// Gateway failure description.
        reason: String,
    },
    /// The gateway call timed out; the transfer may still have landed.
    /// Must be reconciled out-of-band before any retry.
    Unknown {
        /// Ledger transaction row id of the unresolved intent.
        transaction_id: i64,
        /// Amount that may or may not have been transferred.
        #[schema(value_type = String)]
        amount: TokenAmount,
    },
    /// Tier not applicable for this request.
    Skipped {
        /// Why the tier was skipped.
        reason: SkipReason,
    },
}

impl TierOutcome {
    /// Returns `true` if the tier settled as paid.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid { .. })
    }

    /// Returns `true` if the tier failed at the gateway.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of one `distribute` call: both tiers, settled independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DistributionOutcome {
    /// Direct-tier (10%) outcome for the direct referrer.
    pub direct: TierOutcome,
    /// Root-tier (2.5%) outcome for the chain's root ancestor.
    pub root: TierOutcome,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn skip_serializes_with_reason() {
        let outcome = TierOutcome::Skipped {
            reason: SkipReason::RootNotCoreTeam,
        };
        let json = serde_json::to_value(&outcome).unwrap_or_default();
        assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("skipped"));
        assert_eq!(
            json.get("reason").and_then(|v| v.as_str()),
            Some("root_not_core_team")
        );
    }

    #[test]
    fn paid_amount_serializes_as_string() {
        let outcome = TierOutcome::Paid {
            transaction_id: 5,
            transfer_hash: "0xabc".to_string(),
            amount: TokenAmount::new(100),
        };
        let json = serde_json::to_value(&outcome).unwrap_or_default();
        assert_eq!(json.get("amount").and_then(|v| v.as_str()), Some("100"));
        assert!(outcome.is_paid());
    }
}
