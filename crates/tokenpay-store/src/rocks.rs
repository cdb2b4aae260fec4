//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use tokenpay_core::{BalanceRecord, CreditTransaction, ProcessedPayment, TransactionId, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-check-write sequences so two deliveries of the same
    /// payment cannot both observe "not processed".
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Read and decode a value from a column family.
    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<CreditTransaction>> {
        self.get_value(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Balance Operations
    // =========================================================================

    fn get_balance(&self, user_id: &UserId) -> Result<Option<BalanceRecord>> {
        self.get_value(cf::BALANCES, &keys::balance_key(user_id))
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // Collect all matching keys first (ULIDs are naturally time-ordered)
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        let mut transactions = Vec::new();
        for key in all_keys.iter().rev().skip(offset).take(limit) {
            let Some(tx_id) = keys::extract_transaction_id_from_user_key(key) else {
                tracing::warn!(user_id = %user_id, "Skipping malformed transaction index key");
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Processed Payment Operations
    // =========================================================================

    fn get_processed_payment(&self, session_id: &str) -> Result<Option<ProcessedPayment>> {
        self.get_value(
            cf::PROCESSED_PAYMENTS,
            &keys::processed_payment_key(session_id),
        )
    }

    // =========================================================================
    // Compound Operations
    // =========================================================================

    fn apply_purchase(&self, payment: &ProcessedPayment) -> Result<BalanceRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))?;

        // Check for duplicate payment
        if let Some(existing) = self.get_processed_payment(&payment.session_id)? {
            return Err(StoreError::DuplicatePayment {
                session_id: existing.session_id,
                event_id: existing.event_id,
            });
        }

        // Get or create the balance record
        let mut balance = self
            .get_balance(&payment.user_id)?
            .unwrap_or_else(|| BalanceRecord::new(payment.user_id.clone()));

        let balance_after =
            balance
                .credit(payment.credits)
                .ok_or_else(|| StoreError::BalanceOverflow {
                    user_id: payment.user_id.to_string(),
                })?;

        let transaction = CreditTransaction::purchase(payment, balance_after);

        // Prepare updates
        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_tx_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_processed = self.cf(cf::PROCESSED_PAYMENTS)?;

        let balance_key = keys::balance_key(&payment.user_id);
        let tx_key = keys::transaction_key(&transaction.id);
        let user_tx_key = keys::user_transaction_key(&payment.user_id, &transaction.id);
        let processed_key = keys::processed_payment_key(&payment.session_id);

        let balance_value = Self::serialize(&balance)?;
        let tx_value = Self::serialize(&transaction)?;
        let processed_value = Self::serialize(payment)?;

        // Write atomically
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_balances, &balance_key, &balance_value);
        batch.put_cf(&cf_tx, &tx_key, &tx_value);
        batch.put_cf(&cf_tx_by_user, &user_tx_key, []);
        batch.put_cf(&cf_processed, &processed_key, &processed_value);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(balance)
    }
}
