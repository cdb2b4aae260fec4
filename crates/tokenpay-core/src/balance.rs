//! Token balance records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Number of token credits that one US dollar buys.
pub const CREDITS_PER_USD: u64 = 1_000_000;

/// A user's prepaid token balance.
///
/// Records are created lazily on the first successful credit and are only
/// ever mutated by additive increments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    /// The user who owns the balance.
    pub user_id: UserId,

    /// Current token credit balance.
    pub token_credits: u64,

    /// Lifetime credits purchased.
    pub lifetime_purchased: u64,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl BalanceRecord {
    /// Create a new record with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            token_credits: 0,
            lifetime_purchased: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add purchased credits to the balance.
    ///
    /// Returns `None` (leaving the record untouched) if the addition would
    /// overflow.
    #[must_use]
    pub fn credit(&mut self, credits: u64) -> Option<u64> {
        let token_credits = self.token_credits.checked_add(credits)?;
        let lifetime_purchased = self.lifetime_purchased.checked_add(credits)?;
        self.token_credits = token_credits;
        self.lifetime_purchased = lifetime_purchased;
        self.updated_at = Utc::now();
        Some(token_credits)
    }
}

/// Format a credit amount as dollars, e.g. `5_000_000` → `"$5.00"`.
#[must_use]
pub fn format_credits_as_usd(credits: u64) -> String {
    let cents = credits / (CREDITS_PER_USD / 100);
    format!("${}.{:02}", cents / 100, cents % 100)
}
