//! Error types for augur storage.

use augur_core::{BillingError, Currency};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// The database did not complete the operation in time (lock wait, busy).
    #[error("storage timeout")]
    Timeout,

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Record key.
        id: String,
    },

    /// A conditional decrement would have made a balance negative.
    #[error("insufficient {currency:?}: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Currency that ran short.
        currency: Currency,
        /// Current balance.
        balance: i64,
        /// Amount the operation needed.
        required: i64,
    },

    /// An increment would have overflowed a balance.
    #[error("{currency:?} balance {balance} cannot take {amount} more")]
    BalanceOverflow {
        /// Currency that would overflow.
        currency: Currency,
        /// Current balance.
        balance: i64,
        /// Amount the operation tried to add.
        amount: i64,
    },

    /// A reward grant with this key already exists.
    #[error("duplicate grant: {key}")]
    DuplicateGrant {
        /// The idempotency key.
        key: String,
    },

    /// The write conflicts with existing state (duplicate id, illegal transition).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientBalance {
                currency: Currency::Credits,
                balance,
                required,
            } => Self::InsufficientCredits { balance, required },
            StoreError::InsufficientBalance {
                currency: Currency::Diamonds,
                balance,
                required,
            } => Self::InsufficientDiamonds { balance, required },
            err @ StoreError::BalanceOverflow { .. } => Self::InvalidAmount(err.to_string()),
            StoreError::DuplicateGrant { key } => Self::AlreadyClaimed { key },
            StoreError::Timeout => Self::StorageTimeout,
            StoreError::NotFound { entity, id } => {
                Self::LedgerUnavailable(format!("{entity} not found: {id}"))
            }
            StoreError::Conflict(msg) => Self::ActionCreationFailed(msg),
            StoreError::Database(msg) | StoreError::Serialization(msg) => {
                Self::LedgerUnavailable(msg)
            }
        }
    }
}
