//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::gateway::HttpTokenGateway;
use crate::service::{AccountService, RewardService};
use crate::store::PostgresLedger;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Reward distribution engine.
    pub reward_service: Arc<RewardService<PostgresLedger, HttpTokenGateway>>,
    /// Account and referral management.
    pub account_service: Arc<AccountService<PostgresLedger>>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}
