//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use augur_core::BillingError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient credits.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Insufficient diamonds.
    #[error("insufficient diamonds: balance={balance}, required={required}")]
    InsufficientDiamonds {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Reward already claimed for this key.
    #[error("already claimed: {0}")]
    AlreadyClaimed(String),

    /// Transient storage failure; the caller may retry.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::InsufficientDiamonds { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_diamonds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::AlreadyClaimed(key) => (
                StatusCode::CONFLICT,
                "already_claimed",
                format!("Reward {key} already claimed"),
                None,
            ),
            Self::Unavailable(msg) => {
                tracing::warn!(error = %msg, "Storage unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "unavailable",
                    "The service is temporarily unavailable, please retry".to_string(),
                    Some(serde_json::json!({ "retryable": true })),
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            BillingError::InsufficientDiamonds { balance, required } => {
                Self::InsufficientDiamonds { balance, required }
            }
            BillingError::AlreadyClaimed { key } => Self::AlreadyClaimed(key),
            BillingError::RewardUnavailable { kind } => {
                Self::NotFound(format!("no active reward for {}", kind.as_str()))
            }
            BillingError::ActionNotFound(id) => Self::NotFound(format!("action not found: {id}")),
            BillingError::InvalidTransition(msg) => Self::Conflict(msg),
            BillingError::InvalidAmount(msg) => Self::BadRequest(msg),
            BillingError::InvalidId(e) => Self::BadRequest(e.to_string()),
            e @ (BillingError::LedgerUnavailable(_) | BillingError::StorageTimeout) => {
                Self::Unavailable(e.to_string())
            }
            e @ (BillingError::ActionCreationFailed(_)
            | BillingError::RollbackFailed { .. }
            | BillingError::QuotaRaceLost
            | BillingError::Configuration(_)) => Self::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BillingError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn funds_and_availability_are_distinguished() {
        assert_eq!(
            status_of(BillingError::InsufficientCredits {
                balance: 1,
                required: 2
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status_of(BillingError::StorageTimeout), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(BillingError::LedgerUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(BillingError::ActionCreationFailed("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(BillingError::AlreadyClaimed { key: "k".into() }),
            StatusCode::CONFLICT
        );
    }
}
