//! Domain layer: core types, referral tree resolution, and event system.
//!
//! This module contains the server-side domain model including user
//! identity, fixed-point token amounts and the reward split policy, the
//! referral-tree resolver, per-tier distribution outcomes, the event bus
//! for broadcasting payout activity, and per-user payout locks.

pub mod amount;
pub mod event_bus;
pub mod payout_locks;
pub mod referral_tree;
pub mod reward;
pub mod reward_event;
pub mod user_id;

pub use amount::{RewardPolicy, TokenAmount};
pub use event_bus::EventBus;
pub use payout_locks::PayoutLocks;
pub use referral_tree::ReferralLookup;
pub use reward::{DistributionOutcome, SkipReason, TierOutcome};
pub use reward_event::{RewardEvent, RewardTier};
pub use user_id::UserId;
