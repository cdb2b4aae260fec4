//! Stripe API client implementation.

use reqwest::Client;
use std::time::Duration;

use async_trait::async_trait;
use tokenpay_core::BillingError;

use super::types::{CheckoutSession, LineItem, Price, StripeErrorResponse, StripeList};
use crate::provider::{CheckoutRequest, PaymentsProvider};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error ({status}): {error_type} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StripeError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Configuration(_) => false,
        }
    }
}

impl From<StripeError> for BillingError {
    fn from(err: StripeError) -> Self {
        if err.is_transient() {
            Self::TransientProvider(err.to_string())
        } else if let StripeError::Configuration(msg) = err {
            Self::Configuration(msg)
        } else {
            Self::ExternalService(err.to_string())
        }
    }
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StripeClient {
    /// Stripe API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Maximum line items Stripe returns per page.
    const LINE_ITEMS_PAGE: &'static str = "100";

    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `base_url` - API base, normally [`Self::DEFAULT_BASE_URL`]
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StripeError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the first active price for a product.
    pub async fn first_active_price(&self, product_id: &str) -> Result<Option<Price>, StripeError> {
        let response = self
            .client
            .get(format!("{}/prices", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .query(&[("product", product_id), ("active", "true"), ("limit", "1")])
            .send()
            .await?;

        let prices: StripeList<Price> = self.handle_response(response).await?;
        Ok(prices.data.into_iter().next())
    }

    /// Create a Checkout session for a catalog price.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let params = [
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("client_reference_id", request.user_id.to_string()),
            ("line_items[0][price]", request.price_id.clone()),
            ("line_items[0][quantity]", request.quantity.to_string()),
            ("metadata[product_id]", request.product_id.clone()),
        ];

        tracing::debug!(
            user_id = %request.user_id,
            product_id = %request.product_id,
            price_id = %request.price_id,
            "Creating Stripe checkout session"
        );

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List the line items purchased in a Checkout session.
    pub async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        let response = self
            .client
            .get(format!(
                "{}/checkout/sessions/{}/line_items",
                self.base_url, session_id
            ))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .query(&[("limit", Self::LINE_ITEMS_PAGE)])
            .send()
            .await?;

        let items: StripeList<LineItem> = self.handle_response(response).await?;
        if items.has_more {
            tracing::warn!(
                session_id = %session_id,
                returned = items.data.len(),
                "Checkout session has more line items than one page"
            );
        }
        Ok(items.data)
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                status: status.as_u16(),
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                status: status.as_u16(),
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[async_trait]
impl PaymentsProvider for StripeClient {
    async fn first_active_price(&self, product_id: &str) -> Result<Option<Price>, StripeError> {
        StripeClient::first_active_price(self, product_id).await
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        StripeClient::create_checkout_session(self, request).await
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        StripeClient::list_line_items(self, session_id).await
    }
}
