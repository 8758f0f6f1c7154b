//! Token transfer gateway: the external contract interface that moves
//! reward tokens on-chain.
//!
//! [`TokenGateway`] is the seam the reward engine is written against; the
//! production implementation is the HTTP client in [`http`]. The engine
//! owns the call timeout — a gateway call that outlives it settles the
//! tier as `Unknown`, never `Failed`, because the transfer may still have
//! landed after the caller gave up.

pub mod http;

pub use http::HttpTokenGateway;

use crate::domain::TokenAmount;

/// Receipt returned by a successful token transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// On-chain transaction hash of the executed transfer.
    pub hash: String,
}

/// Failure modes of a transfer attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The gateway processed the request and rejected it (contract
    /// revert, insufficient funds, invalid address).
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The request never completed at the transport level. The transfer
    /// most likely did not execute, but this is not guaranteed.
    #[error("gateway unreachable: {0}")]
    Transport(String),
}

/// External token transfer interface.
pub trait TokenGateway: Send + Sync {
    /// Transfers `amount` to `wallet_address`, returning the on-chain
    /// transfer hash.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError`] when the gateway rejects the transfer
    /// or cannot be reached.
    fn transfer(
        &self,
        wallet_address: &str,
        amount: TokenAmount,
    ) -> impl Future<Output = Result<TransferReceipt, TransferError>> + Send;
}
