//! Domain events reflecting account and payout activity.
//!
//! Every settled reward tier and every referral mutation emits a
//! [`RewardEvent`] through the [`super::EventBus`]. Events are broadcast
//! to WebSocket subscribers filtered by user id.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{SkipReason, TokenAmount, UserId};

/// Which reward tier an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTier {
    /// Direct referrer tier (10%).
    Direct,
    /// Root ancestor tier (2.5%).
    Root,
}

/// Domain event emitted after account and payout mutations.
///
/// All amounts are serialized as strings to preserve `u128` precision.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RewardEvent {
    /// Emitted when a referral edge is created at signup.
    ReferralRegistered {
        /// The referring user.
        referrer: UserId,
        /// The newly referred user.
        referred: UserId,
        /// Edge creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a user links a wallet address.
    WalletLinked {
        /// The user who linked the wallet.
        user: UserId,
        /// The linked wallet address.
        wallet_address: String,
        /// Linkage timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reward tier transfer completes.
    TierPaid {
        /// Reward recipient.
        recipient: UserId,
        /// Referred user the distribution was triggered for.
        referred: UserId,
        /// Which tier was paid.
        tier: RewardTier,
        /// Amount paid (string-encoded u128).
        amount: TokenAmount,
        /// On-chain transfer hash.
        transfer_hash: String,
        /// Settlement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reward tier transfer fails or times out.
    TierUnsettled {
        /// Intended recipient.
        recipient: UserId,
        /// Referred user the distribution was triggered for.
        referred: UserId,
        /// Which tier did not settle.
        tier: RewardTier,
        /// Failure description, or `"timeout"` for unknown outcomes.
        reason: String,
        /// Timestamp of the attempt.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a reward tier is skipped by policy.
    TierSkipped {
        /// Referred user the distribution was triggered for.
        referred: UserId,
        /// Which tier was skipped.
        tier: RewardTier,
        /// Why the tier was skipped.
        reason: SkipReason,
        /// Timestamp of the decision.
        timestamp: DateTime<Utc>,
    },
}

impl RewardEvent {
    /// The user this event primarily concerns, used for subscription
    /// filtering: the recipient for tier events, the referrer for edge
    /// creation, the linking user for wallet events.
    #[must_use]
    pub const fn subject(&self) -> UserId {
        match self {
            Self::ReferralRegistered { referrer, .. } => *referrer,
            Self::WalletLinked { user, .. } => *user,
            Self::TierPaid { recipient, .. } | Self::TierUnsettled { recipient, .. } => *recipient,
            Self::TierSkipped { referred, .. } => *referred,
        }
    }

    /// Event type discriminator string, matching the serialized tag.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ReferralRegistered { .. } => "referral_registered",
            Self::WalletLinked { .. } => "wallet_linked",
            Self::TierPaid { .. } => "tier_paid",
            Self::TierUnsettled { .. } => "tier_unsettled",
            Self::TierSkipped { .. } => "tier_skipped",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn tier_paid_subject_is_recipient() {
        let event = RewardEvent::TierPaid {
            recipient: UserId::new(2),
            referred: UserId::new(9),
            tier: RewardTier::Direct,
            amount: TokenAmount::new(100),
            transfer_hash: "0xdead".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.subject(), UserId::new(2));
        assert_eq!(event.event_type_str(), "tier_paid");
    }

    #[test]
    fn serialized_tag_matches_discriminator() {
        let event = RewardEvent::WalletLinked {
            user: UserId::new(1),
            wallet_address: "0xbeef".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(
            json.get("event_type").and_then(|v| v.as_str()),
            Some(event.event_type_str())
        );
    }
}
