//! Error types for augur.

use crate::ids::{ActionId, IdError, UserId};
use crate::reward::RewardKind;

/// Result type for augur operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in entitlement, metering and reward operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Not enough credits for the requested action. User-facing; suggests a top-up.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current credit balance.
        balance: i64,
        /// Credits required by the action.
        required: i64,
    },

    /// Not enough diamonds for a conversion.
    #[error("insufficient diamonds: balance={balance}, required={required}")]
    InsufficientDiamonds {
        /// Current diamond balance.
        balance: i64,
        /// Diamonds required.
        required: i64,
    },

    /// A concurrent submission took the last free slot.
    ///
    /// Internal only: the orchestrator falls back to a balance check and never
    /// surfaces this variant to callers.
    #[error("free quota taken by a concurrent submission")]
    QuotaRaceLost,

    /// The reward for this idempotency key was already granted.
    #[error("reward already claimed: {key}")]
    AlreadyClaimed {
        /// The idempotency key that was already used.
        key: String,
    },

    /// The reward rule is missing or inactive.
    #[error("reward unavailable: {kind:?}")]
    RewardUnavailable {
        /// The reward kind that was requested.
        kind: RewardKind,
    },

    /// Storage is unreachable or returned an error. Retryable.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// Storage did not complete the atomic operation in time. Retryable.
    #[error("storage timeout")]
    StorageTimeout,

    /// The action record could not be created; the charge was reversed.
    #[error("action creation failed: {0}")]
    ActionCreationFailed(String),

    /// The compensating reversal itself failed. Requires manual reconciliation.
    #[error("rollback failed for {user_id} action {action_id} amount {amount}: {message}")]
    RollbackFailed {
        /// The user that was charged.
        user_id: UserId,
        /// The action whose charge could not be reversed.
        action_id: ActionId,
        /// The amount left debited.
        amount: i64,
        /// Underlying storage error.
        message: String,
    },

    /// Action record not found.
    #[error("action not found: {0}")]
    ActionNotFound(ActionId),

    /// The action is not in a state that allows the requested status change.
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BillingError {
    /// Whether the failure is a transient infrastructure fault the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_) | Self::StorageTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_infrastructure_faults_are_retryable() {
        assert!(BillingError::StorageTimeout.is_retryable());
        assert!(BillingError::LedgerUnavailable("down".into()).is_retryable());
        assert!(!BillingError::InsufficientCredits {
            balance: 0,
            required: 1
        }
        .is_retryable());
        assert!(!BillingError::AlreadyClaimed { key: "k".into() }.is_retryable());
    }
}
