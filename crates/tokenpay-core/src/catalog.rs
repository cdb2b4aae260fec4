//! Product catalog: which products can be bought and what they grant.
//!
//! Credit amounts come only from this server-side table, never from the
//! amount paid or from checkout metadata.

use std::collections::BTreeMap;
use std::str::FromStr;

/// Static mapping from product identifier to credits granted per unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCreditTable {
    credits: BTreeMap<String, u64>,
}

impl ProductCreditTable {
    /// Build a table from `(product_id, credits_per_unit)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a product is listed twice or grants zero credits.
    pub fn new<I, S>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut credits = BTreeMap::new();
        for (product_id, amount) in entries {
            let product_id = product_id.into();
            if product_id.is_empty() {
                return Err(CatalogError::Malformed(String::new()));
            }
            if amount == 0 {
                return Err(CatalogError::ZeroCredits(product_id));
            }
            if credits.insert(product_id.clone(), amount).is_some() {
                return Err(CatalogError::Duplicate(product_id));
            }
        }
        Ok(Self { credits })
    }

    /// Credits granted per unit of `product_id`, if the product is known.
    #[must_use]
    pub fn credits_per_unit(&self, product_id: &str) -> Option<u64> {
        self.credits.get(product_id).copied()
    }

    /// Credits granted for `quantity` units of `product_id`.
    ///
    /// Returns `None` for unknown products or if the total overflows.
    #[must_use]
    pub fn credits_for(&self, product_id: &str, quantity: u64) -> Option<u64> {
        self.credits_per_unit(product_id)?.checked_mul(quantity)
    }

    /// Whether `product_id` can be purchased.
    #[must_use]
    pub fn contains(&self, product_id: &str) -> bool {
        self.credits.contains_key(product_id)
    }

    /// All purchasable product identifiers.
    pub fn product_ids(&self) -> impl Iterator<Item = &str> {
        self.credits.keys().map(String::as_str)
    }

    /// Number of products in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credits.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

impl Default for ProductCreditTable {
    /// The $5, $10 and $25 token packs offered by the balance dialog.
    fn default() -> Self {
        Self {
            credits: BTreeMap::from([
                ("prod_S8Xll00KkF8qlY".to_string(), 5_000_000),
                ("prod_S8XlkZMk8dnfdR".to_string(), 10_000_000),
                ("prod_S8XmYxnNpZUuow".to_string(), 25_000_000),
            ]),
        }
    }
}

impl FromStr for ProductCreditTable {
    type Err = CatalogError;

    /// Parse `prod_a=5000000,prod_b=10000000`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entries = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (product, credits) = entry
                    .split_once('=')
                    .ok_or_else(|| CatalogError::Malformed(entry.to_string()))?;
                let credits = credits
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| CatalogError::Malformed(entry.to_string()))?;
                Ok((product.trim().to_string(), credits))
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Self::new(entries)
    }
}

/// Errors building a product credit table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// An entry could not be parsed.
    #[error("malformed product credit entry: {0:?}")]
    Malformed(String),

    /// A product was listed more than once.
    #[error("product listed twice: {0}")]
    Duplicate(String),

    /// A product grants no credits.
    #[error("product grants zero credits: {0}")]
    ZeroCredits(String),

    /// No products were configured.
    #[error("product credit table is empty")]
    Empty,
}
