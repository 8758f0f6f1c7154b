//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::UserId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "user 42 has no referrer",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`ServiceError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                  |
/// |-----------|-------------------|------------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request              |
/// | 2000–2999 | State/Not Found   | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server            | 500 Internal Server Error    |
/// | 4000–4999 | Transfer Gateway  | 502 Bad Gateway              |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Reward recipient has no wallet address on file.
    #[error("user {0} has no linked wallet address")]
    MissingWallet(UserId),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Referred user has no inbound referral edge.
    #[error("user {0} has no referrer")]
    NoReferrer(UserId),

    /// Email address is already registered.
    #[error("email already registered: {0}")]
    AlreadyRegistered(String),

    /// User already has a referrer; a second inbound edge is not allowed.
    #[error("user {0} is already referred")]
    AlreadyReferred(UserId),

    /// Creating or walking the edge would close a referral cycle.
    #[error("referral cycle detected at user {0}")]
    ReferralCycle(UserId),

    /// A payout for this `(referred, source_event)` pair was already claimed.
    #[error("payout for user {referred} and event {source_event} already claimed")]
    DuplicatePayout {
        /// Referred user whose payout was requested.
        referred: UserId,
        /// Idempotency key of the replayed request.
        source_event: uuid::Uuid,
    },

    /// Token transfer gateway reported a failure.
    #[error("token transfer failed: {0}")]
    TransferFailed(String),

    /// Persistence layer failure.
    #[error("store error: {0}")]
    Store(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MissingWallet(_) => 1002,
            Self::UserNotFound(_) => 2001,
            Self::NoReferrer(_) => 2002,
            Self::AlreadyRegistered(_) => 2003,
            Self::AlreadyReferred(_) => 2004,
            Self::ReferralCycle(_) => 2005,
            Self::DuplicatePayout { .. } => 2006,
            Self::TransferFailed(_) => 4001,
            Self::Store(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MissingWallet(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound(_) | Self::NoReferrer(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRegistered(_)
            | Self::AlreadyReferred(_)
            | Self::ReferralCycle(_)
            | Self::DuplicatePayout { .. } => StatusCode::CONFLICT,
            Self::TransferFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn no_referrer_maps_to_404() {
        let err = ServiceError::NoReferrer(UserId::new(7));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2002);
    }

    #[test]
    fn missing_wallet_maps_to_400() {
        let err = ServiceError::MissingWallet(UserId::new(7));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn duplicate_payout_maps_to_409() {
        let err = ServiceError::DuplicatePayout {
            referred: UserId::new(1),
            source_event: uuid::Uuid::new_v4(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn transfer_failure_maps_to_502() {
        let err = ServiceError::TransferFailed("nonce contention".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_code(), 4001);
    }
}
