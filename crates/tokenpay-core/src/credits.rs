//! Ledger types for applied credits.
//!
//! Every credit applied to a balance produces a `CreditTransaction` (the
//! user-visible history line) and a `ProcessedPayment` (the idempotency
//! marker keyed by checkout session).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// A credit transaction representing a balance change.
///
/// Transactions use ULIDs for time-ordered IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Credits added.
    pub amount: u64,

    /// Balance after this transaction.
    pub balance_after: u64,

    /// Checkout session that paid for the credits.
    pub session_id: String,

    /// Human-readable description.
    pub description: String,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Build the ledger line for a processed payment.
    #[must_use]
    pub fn purchase(payment: &ProcessedPayment, balance_after: u64) -> Self {
        Self {
            id: payment.transaction_id,
            user_id: payment.user_id.clone(),
            amount: payment.credits,
            balance_after,
            session_id: payment.session_id.clone(),
            description: format!(
                "Purchased {} token credits (session: {})",
                payment.credits, payment.session_id
            ),
            created_at: payment.processed_at,
        }
    }
}

/// Durable record that a checkout session has been credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPayment {
    /// Checkout session ID (the idempotency key).
    pub session_id: String,

    /// Provider event that triggered the credit.
    pub event_id: String,

    /// The credited user.
    pub user_id: UserId,

    /// Credits applied.
    pub credits: u64,

    /// Ledger transaction written alongside this marker.
    pub transaction_id: TransactionId,

    /// When the credit was applied.
    pub processed_at: DateTime<Utc>,
}

impl ProcessedPayment {
    /// Create a marker for a payment about to be applied.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        event_id: impl Into<String>,
        user_id: UserId,
        credits: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            event_id: event_id.into(),
            user_id,
            credits,
            transaction_id: TransactionId::generate(),
            processed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_transaction_mirrors_payment() {
        let user_id: UserId = "u123".parse().unwrap();
        let payment = ProcessedPayment::new("cs_test_1", "evt_1", user_id.clone(), 5_000_000);
        let tx = CreditTransaction::purchase(&payment, 7_000_000);

        assert_eq!(tx.id, payment.transaction_id);
        assert_eq!(tx.user_id, user_id);
        assert_eq!(tx.amount, 5_000_000);
        assert_eq!(tx.balance_after, 7_000_000);
        assert_eq!(tx.session_id, "cs_test_1");
        assert!(tx.description.contains("cs_test_1"));
    }
}
