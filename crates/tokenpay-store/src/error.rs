//! Error types for tokenpay storage.

use tokenpay_core::BillingError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The checkout session has already been credited.
    #[error("duplicate payment: session {session_id} already processed by {event_id}")]
    DuplicatePayment {
        /// The session that was already credited.
        session_id: String,
        /// The event that credited it first.
        event_id: String,
    },

    /// Applying the credit would overflow the balance.
    #[error("balance overflow for user {user_id}")]
    BalanceOverflow {
        /// The affected user.
        user_id: String,
    },
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BalanceOverflow { .. } => Self::DataIntegrity(err.to_string()),
            StoreError::Database(_)
            | StoreError::Serialization(_)
            | StoreError::DuplicatePayment { .. } => Self::Storage(err.to_string()),
        }
    }
}
