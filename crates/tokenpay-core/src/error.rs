//! Error types for tokenpay.

use crate::ids::IdError;

/// Result type for tokenpay operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur while creating checkouts or crediting balances.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Webhook signature missing, malformed, stale or mismatched.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A required resource does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of resource.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The payments provider could not be reached or asked us to retry.
    #[error("payments provider unavailable: {0}")]
    TransientProvider(String),

    /// The payments provider rejected the request.
    #[error("payments provider error: {0}")]
    ExternalService(String),

    /// The event is structurally valid but cannot be applied (unknown user,
    /// unmapped product). Retrying will not help.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// The payload could not be parsed.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// An operation did not finish in time.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

impl BillingError {
    /// Whether the failure may succeed if the same request is retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransientProvider(_) | Self::Storage(_) | Self::Timeout(_)
        )
    }
}
