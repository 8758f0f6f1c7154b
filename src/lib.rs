//! # referral-gateway
//!
//! REST API and WebSocket gateway for referral reward distribution over
//! a user ledger.
//!
//! This crate provides the account surface (signup, wallet linkage,
//! profiles, transaction history) and the two-tier referral reward
//! engine: 10% of a gross value to the direct referrer, 2.5% to the
//! chain's root ancestor when that root is a core-team member. Token
//! movement is delegated to an external transfer gateway — this service
//! is a coordination layer.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── RewardService / AccountService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Referral Tree Resolver (domain/)
//!     ├── Token Transfer Gateway (gateway/)
//!     │
//!     └── PostgreSQL Ledger (store/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod service;
pub mod store;
pub mod ws;
