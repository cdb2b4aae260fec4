//! Token balance and purchase history handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tokenpay_core::{format_credits_as_usd, CreditTransaction};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Largest page the history endpoint returns.
const MAX_PAGE: usize = 100;

/// Current balance for the caller.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The authenticated user.
    pub user_id: String,
    /// Spendable token credits.
    pub token_credits: u64,
    /// Dollar value at 1,000,000 credits per USD, e.g. `$5.00`.
    pub balance_formatted: String,
}

/// Get the current token balance.
///
/// A user who has never bought anything has a zero balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let token_credits = state
        .store
        .get_balance(&auth.user_id)?
        .map_or(0, |balance| balance.token_credits);

    Ok(Json(BalanceResponse {
        user_id: auth.user_id.to_string(),
        token_credits,
        balance_formatted: format_credits_as_usd(token_credits),
    }))
}

/// `?limit=&offset=` for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryPage {
    /// Page size, capped at 100 (default: 50).
    #[serde(default = "HistoryPage::default_limit")]
    pub limit: usize,
    /// Rows to skip (default: 0).
    #[serde(default)]
    pub offset: usize,
}

impl HistoryPage {
    const fn default_limit() -> usize {
        50
    }

    /// Effective page size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.limit.min(MAX_PAGE)
    }
}

/// A purchase as shown in the history view.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Ledger transaction ULID.
    pub id: String,
    /// Credits bought.
    pub amount: u64,
    /// Balance once the purchase landed.
    pub balance_after: u64,
    /// Checkout session that paid for it.
    pub session_id: String,
    /// Human-readable summary.
    pub description: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            balance_after: tx.balance_after,
            session_id: tx.session_id.clone(),
            description: tx.description.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// One page of purchase history.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Purchases, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Whether a further page exists.
    pub has_more: bool,
}

/// List purchase history, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(page): Query<HistoryPage>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let size = page.size();

    // One extra row tells us whether another page exists.
    let mut rows = state
        .store
        .list_transactions_by_user(&auth.user_id, size + 1, page.offset)?;
    let has_more = rows.len() > size;
    rows.truncate(size);

    Ok(Json(HistoryResponse {
        transactions: rows.iter().map(TransactionResponse::from).collect(),
        has_more,
    }))
}
