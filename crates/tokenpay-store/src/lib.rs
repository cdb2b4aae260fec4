//! `RocksDB` storage layer for tokenpay.
//!
//! This crate provides persistent storage for token balances, the purchase
//! ledger, and the processed-payment markers that make webhook crediting
//! idempotent across restarts.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `balances`: Balance records, keyed by `user_id`
//! - `transactions`: Credit transactions, keyed by `transaction_id` (ULID)
//! - `transactions_by_user`: Index for listing transactions by user
//! - `processed_payments`: Credited checkout sessions, keyed by `session_id`
//!
//! # Example
//!
//! ```no_run
//! use tokenpay_core::{ProcessedPayment, UserId};
//! use tokenpay_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/tokenpay-db").unwrap();
//!
//! let user_id: UserId = "u123".parse().unwrap();
//! let payment = ProcessedPayment::new("cs_test_1", "evt_1", user_id.clone(), 5_000_000);
//! store.apply_purchase(&payment).unwrap();
//!
//! let balance = store.get_balance(&user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use tokenpay_core::{BalanceRecord, CreditTransaction, ProcessedPayment, UserId};

/// The storage trait defining all database operations.
pub trait Store: Send + Sync {
    // =========================================================================
    // Balance Operations
    // =========================================================================

    /// Get a user's balance record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_balance(&self, user_id: &UserId) -> Result<Option<BalanceRecord>>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// List transactions for a user, ordered by time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    // =========================================================================
    // Processed Payment Operations (for idempotency)
    // =========================================================================

    /// Get the marker for a checkout session, if it has been credited.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_processed_payment(&self, session_id: &str) -> Result<Option<ProcessedPayment>>;

    // =========================================================================
    // Compound Operations
    // =========================================================================

    /// Credit a payment exactly once.
    ///
    /// Atomically checks the processed-payment marker, creates the balance
    /// record if needed, adds the credits, and writes the balance, the ledger
    /// transaction, its user index entry and the marker in a single batch.
    ///
    /// Returns the updated balance record.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicatePayment` if the session was already credited.
    /// - `StoreError::BalanceOverflow` if the credit would overflow.
    fn apply_purchase(&self, payment: &ProcessedPayment) -> Result<BalanceRecord>;
}
