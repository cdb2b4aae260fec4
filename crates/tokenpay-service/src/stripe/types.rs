//! Stripe API types.

use serde::Deserialize;

/// Stripe Price object.
#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    /// Price ID.
    pub id: String,
    /// Product this price belongs to.
    #[serde(default)]
    pub product: Option<String>,
    /// Whether the price can be used for new purchases.
    #[serde(default)]
    pub active: bool,
    /// Unit amount in cents.
    #[serde(default)]
    pub unit_amount: Option<i64>,
    /// Currency (e.g., "usd").
    #[serde(default)]
    pub currency: Option<String>,
}

/// A purchased line item on a Checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct LineItem {
    /// Line item ID.
    pub id: String,
    /// Quantity purchased.
    #[serde(default)]
    pub quantity: Option<u64>,
    /// The price that was charged.
    #[serde(default)]
    pub price: Option<Price>,
}

/// Stripe Checkout session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID.
    pub id: String,
    /// Checkout URL to redirect the user to.
    #[serde(default)]
    pub url: Option<String>,
    /// Payment status (`paid`, `unpaid`, `no_payment_required`).
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Client reference ID (our `user_id`, set at session creation).
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Total amount in cents.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Session status.
    #[serde(default)]
    pub status: Option<String>,
    /// Line items, present only when expanded.
    #[serde(default)]
    pub line_items: Option<StripeList<LineItem>>,
    /// Metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl CheckoutSession {
    /// Whether the customer has paid for this session.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

/// Stripe list response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    /// Data items.
    pub data: Vec<T>,
    /// Whether there are more items.
    #[serde(default)]
    pub has_more: bool,
}

/// Stripe webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID.
    pub id: String,
    /// Event type (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: WebhookEventData,
    /// Created timestamp (Unix).
    #[serde(default)]
    pub created: i64,
}

/// Webhook event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The event object.
    pub object: serde_json::Value,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completed_session_with_expanded_line_items() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "object": "checkout.session",
            "payment_status": "paid",
            "client_reference_id": "u123",
            "line_items": {
                "object": "list",
                "data": [{
                    "id": "li_1",
                    "quantity": 2,
                    "price": { "id": "price_5", "product": "prod_5", "active": true }
                }],
                "has_more": false
            }
        }))
        .unwrap();

        assert!(session.is_paid());
        let items = session.line_items.unwrap().data;
        assert_eq!(items[0].quantity, Some(2));
        assert_eq!(
            items[0].price.as_ref().unwrap().product.as_deref(),
            Some("prod_5")
        );
    }

    #[test]
    fn unpaid_session_is_not_paid() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_2",
            "payment_status": "unpaid"
        }))
        .unwrap();
        assert!(!session.is_paid());
        assert!(session.line_items.is_none());
    }
}
