//! Key encoding utilities for `RocksDB`.

use tokenpay_core::{TransactionId, UserId};

/// Separator between the user ID and the transaction ID in index keys.
///
/// `UserId` rejects control characters, so the separator cannot appear inside
/// a user ID and one user's prefix never matches another user's keys.
const SEPARATOR: u8 = 0x00;

/// Create a balance key from a user ID.
#[must_use]
pub fn balance_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id || 0x00 || transaction_id (16 bytes)`
///
/// Since ULIDs are time-ordered, transactions for a user will be sorted by time.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = user_transactions_prefix(user_id);
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all transactions for a user.
#[must_use]
pub fn user_transactions_prefix(user_id: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.as_bytes().len() + 17);
    key.extend_from_slice(user_id.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Extract the transaction ID from a user-transaction index key.
///
/// Returns `None` if the key is shorter than a transaction ID.
#[must_use]
pub fn extract_transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let start = key.len().checked_sub(16)?;
    let bytes: [u8; 16] = key[start..].try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}

/// Create a processed-payment key from a checkout session ID.
#[must_use]
pub fn processed_payment_key(session_id: &str) -> Vec<u8> {
    session_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        id.parse().unwrap()
    }

    #[test]
    fn user_transaction_key_format() {
        let user_id = user("u123");
        let tx_id = TransactionId::generate();
        let key = user_transaction_key(&user_id, &tx_id);

        assert_eq!(key.len(), 4 + 1 + 16);
        assert_eq!(&key[..4], b"u123");
        assert_eq!(key[4], SEPARATOR);
        assert_eq!(&key[5..], tx_id.to_bytes());
    }

    #[test]
    fn prefixes_do_not_overlap_between_users() {
        let tx_id = TransactionId::generate();
        let key = user_transaction_key(&user("u12"), &tx_id);
        assert!(key.starts_with(&user_transactions_prefix(&user("u12"))));
        assert!(!key.starts_with(&user_transactions_prefix(&user("u1"))));
    }

    #[test]
    fn extract_transaction_id_roundtrip() {
        let tx_id = TransactionId::generate();
        let key = user_transaction_key(&user("u123"), &tx_id);
        assert_eq!(extract_transaction_id_from_user_key(&key), Some(tx_id));
        assert_eq!(extract_transaction_id_from_user_key(b"short"), None);
    }
}
