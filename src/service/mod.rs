//! Service layer: business logic orchestration.
//!
//! [`RewardService`] runs the two-tier reward distribution over the
//! ledger store and transfer gateway; [`AccountService`] owns signup,
//! referral-edge creation, and the account read surface. Both emit
//! domain events through the [`crate::domain::EventBus`].

pub mod account_service;
pub mod reward_service;

pub use account_service::{AccountService, UserProfile};
pub use reward_service::RewardService;
