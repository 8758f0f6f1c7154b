//! HTTP client for the token transfer gateway.
//!
//! Posts transfer requests as JSON to the contract-gateway service and
//! maps its responses into [`TransferReceipt`] / [`TransferError`]. The
//! client carries its own transport timeout; the reward engine layers the
//! caller-supplied settlement timeout on top.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use super::{TokenGateway, TransferError, TransferReceipt};
use crate::domain::TokenAmount;

const CLIENT_USER_AGENT: &str = concat!("referral-gateway/", env!("CARGO_PKG_VERSION"));

/// JSON body sent to `POST {base_url}/transfers`.
#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    to: &'a str,
    /// Amount in smallest units, as a decimal string.
    amount: String,
}

/// Success body: `{"hash": "0x..."}`.
#[derive(Debug, Deserialize)]
struct TransferResponse {
    hash: String,
}

/// Error body: `{"error": "..."}` (free-form `reason` also accepted).
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(alias = "reason")]
    error: Option<String>,
}

/// `reqwest`-backed [`TokenGateway`] implementation.
#[derive(Debug, Clone)]
pub struct HttpTokenGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTokenGateway {
    /// Creates a client for the gateway at `base_url`.
    ///
    /// `transport_timeout` bounds each HTTP round trip; `api_key`, when
    /// set, is sent as a bearer token.
    ///
    /// # Errors
    ///
    /// Returns a [`TransferError::Transport`] if the underlying HTTP
    /// client cannot be constructed.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        transport_timeout: Duration,
    ) -> Result<Self, TransferError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        if let Some(key) = api_key
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}"))
        {
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(transport_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl TokenGateway for HttpTokenGateway {
    async fn transfer(
        &self,
        wallet_address: &str,
        amount: TokenAmount,
    ) -> Result<TransferReceipt, TransferError> {
        let url = format!("{}/transfers", self.base_url);
        let body = TransferRequest {
            to: wallet_address,
            amount: amount.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransferError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let receipt: TransferResponse = response
                .json()
                .await
                .map_err(|e| TransferError::Transport(format!("malformed receipt: {e}")))?;
            tracing::debug!(hash = %receipt.hash, "transfer accepted");
            return Ok(TransferReceipt {
                hash: receipt.hash,
            });
        }

        let reason = response
            .json::<GatewayErrorBody>()
            .await
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("gateway returned {status}"));
        tracing::warn!(%status, reason, "transfer rejected");
        Err(TransferError::Rejected(reason))
    }
}
