//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams reward and referral events to
//! clients, filtered by user-id subscriptions.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
