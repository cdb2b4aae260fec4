//! The payments-provider seam.
//!
//! Handlers and the ledger talk to the provider only through
//! [`PaymentsProvider`], so tests can substitute an in-process fake and a
//! different provider could be plugged in without touching the ledger.

use async_trait::async_trait;

use tokenpay_core::UserId;

use crate::stripe::{CheckoutSession, LineItem, Price, StripeError};

/// Parameters for a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    /// Catalog product being bought.
    pub product_id: String,
    /// Provider price charged for the product.
    pub price_id: String,
    /// Units purchased.
    pub quantity: u64,
    /// Authenticated buyer, attached as the session's client reference.
    pub user_id: UserId,
    /// Redirect after payment.
    pub success_url: String,
    /// Redirect if the buyer abandons checkout.
    pub cancel_url: String,
}

/// Operations the service needs from the payments provider.
#[async_trait]
pub trait PaymentsProvider: Send + Sync {
    /// Fetch the first active price for a product, if any.
    async fn first_active_price(&self, product_id: &str) -> Result<Option<Price>, StripeError>;

    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError>;

    /// List the line items purchased in a checkout session.
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError>;
}
