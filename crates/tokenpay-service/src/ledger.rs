//! Webhook processing: verified provider events in, credited balances out.
//!
//! A delivery moves through verification, parsing, credit computation and a
//! single atomic store write. The checkout-session id is the idempotency key:
//! redeliveries and a late `async_payment_succeeded` for an already-credited
//! session both resolve to [`WebhookOutcome::Duplicate`].

use std::sync::Arc;
use std::time::Duration;

use tokenpay_core::{BillingError, ProcessedPayment, ProductCreditTable, UserId};
use tokenpay_store::{Store, StoreError};

use crate::crypto;
use crate::prices::PriceResolver;
use crate::provider::PaymentsProvider;
use crate::stripe::{CheckoutSession, LineItem, WebhookEvent};

/// Checkout completed; payment may still be pending for async methods.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Delayed payment method settled for a checkout session.
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

/// Default bound on the atomic credit write.
pub const DEFAULT_CREDIT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a verified delivery was handled. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Credits were added to the user's balance.
    Credited {
        /// Credited user.
        user_id: UserId,
        /// Credits added.
        credits: u64,
        /// Balance after the credit.
        balance: u64,
    },
    /// The session was already credited.
    Duplicate {
        /// The already-credited session.
        session_id: String,
    },
    /// Event type we do not act on.
    Ignored {
        /// The event type received.
        event_type: String,
    },
    /// Actionable event that cannot be applied; retrying will not help.
    Skipped {
        /// Why nothing was credited.
        reason: String,
    },
}

impl WebhookOutcome {
    /// Short machine-readable name for responses and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Credited { .. } => "credited",
            Self::Duplicate { .. } => "duplicate",
            Self::Ignored { .. } => "ignored",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Applies verified checkout events to token balances exactly once.
pub struct LedgerUpdater {
    store: Arc<dyn Store>,
    provider: Option<Arc<dyn PaymentsProvider>>,
    prices: Arc<PriceResolver>,
    catalog: ProductCreditTable,
    tolerance: Duration,
    credit_timeout: Duration,
}

impl LedgerUpdater {
    /// Create an updater with default signature tolerance and write timeout.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        provider: Option<Arc<dyn PaymentsProvider>>,
        prices: Arc<PriceResolver>,
        catalog: ProductCreditTable,
    ) -> Self {
        Self {
            store,
            provider,
            prices,
            catalog,
            tolerance: crypto::DEFAULT_TOLERANCE,
            credit_timeout: DEFAULT_CREDIT_TIMEOUT,
        }
    }

    /// Set the accepted signature age. Zero disables the check.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the bound on the atomic credit write.
    #[must_use]
    pub const fn with_credit_timeout(mut self, timeout: Duration) -> Self {
        self.credit_timeout = timeout;
        self
    }

    /// The product → credits table used for crediting.
    #[must_use]
    pub const fn catalog(&self) -> &ProductCreditTable {
        &self.catalog
    }

    /// Verify, parse and apply one webhook delivery.
    ///
    /// # Errors
    ///
    /// - `BillingError::Authentication` if the signature does not verify.
    /// - `BillingError::InvalidPayload` if the body is not a provider event.
    /// - `BillingError::TransientProvider` / `ExternalService` if line items
    ///   cannot be fetched.
    /// - `BillingError::Storage` / `Timeout` if the credit cannot be written.
    ///
    /// Any error means nothing was credited and the provider should redeliver.
    pub async fn process(
        &self,
        payload: &[u8],
        signature: &str,
        secret: &str,
    ) -> Result<WebhookOutcome, BillingError> {
        let now = chrono::Utc::now().timestamp();
        crypto::verify_signature(payload, signature, secret, self.tolerance, now).map_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook signature");
            BillingError::Authentication(e.to_string())
        })?;

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::InvalidPayload(e.to_string()))?;

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Received Stripe webhook"
        );

        match event.event_type.as_str() {
            CHECKOUT_COMPLETED | ASYNC_PAYMENT_SUCCEEDED => self.handle_checkout(&event).await,
            _ => {
                tracing::debug!(event_type = %event.event_type, "Unhandled Stripe event");
                Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type,
                })
            }
        }
    }

    async fn handle_checkout(&self, event: &WebhookEvent) -> Result<WebhookOutcome, BillingError> {
        let session: CheckoutSession = serde_json::from_value(event.data.object.clone())
            .map_err(|e| BillingError::InvalidPayload(format!("checkout session: {e}")))?;

        match self.credit_session(event, &session).await {
            Err(BillingError::DataIntegrity(reason)) => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    user_id = ?session.client_reference_id,
                    reason = %reason,
                    "Checkout session cannot be credited; acknowledging without change"
                );
                Ok(WebhookOutcome::Skipped { reason })
            }
            other => other,
        }
    }

    async fn credit_session(
        &self,
        event: &WebhookEvent,
        session: &CheckoutSession,
    ) -> Result<WebhookOutcome, BillingError> {
        if !session.is_paid() {
            let status = session.payment_status.as_deref().unwrap_or("unknown");
            tracing::info!(
                event_id = %event.id,
                session_id = %session.id,
                payment_status = %status,
                "Checkout session not paid yet, skipping"
            );
            return Ok(WebhookOutcome::Skipped {
                reason: format!("payment status is {status}"),
            });
        }

        let user_id = resolve_user(session)?;

        let session_id = session.id.clone();
        let processed = self
            .blocking("processed-payment lookup", move |store| {
                store.get_processed_payment(&session_id)
            })
            .await??;
        if let Some(processed) = processed {
            tracing::info!(
                event_id = %event.id,
                session_id = %session.id,
                first_event_id = %processed.event_id,
                "Checkout session already credited"
            );
            return Ok(WebhookOutcome::Duplicate {
                session_id: session.id.clone(),
            });
        }

        let items = self.line_items(session).await?;
        let credits = self.credits_for_items(&session.id, &items).await?;

        tracing::debug!(
            event_id = %event.id,
            session_id = %session.id,
            user_id = %user_id,
            credits = credits,
            "Applying checkout credit"
        );

        let payment = ProcessedPayment::new(session.id.as_str(), event.id.as_str(), user_id, credits);
        let user_id = payment.user_id.clone();
        match self
            .blocking("credit write", move |store| store.apply_purchase(&payment))
            .await?
        {
            Ok(balance) => {
                tracing::info!(
                    event_id = %event.id,
                    session_id = %session.id,
                    user_id = %user_id,
                    credits = credits,
                    balance = balance.token_credits,
                    "Credits added from Stripe checkout"
                );
                Ok(WebhookOutcome::Credited {
                    user_id,
                    credits,
                    balance: balance.token_credits,
                })
            }
            Err(StoreError::DuplicatePayment { session_id, .. }) => {
                tracing::info!(
                    event_id = %event.id,
                    session_id = %session_id,
                    "Checkout session credited by a concurrent delivery"
                );
                Ok(WebhookOutcome::Duplicate { session_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn line_items(&self, session: &CheckoutSession) -> Result<Vec<LineItem>, BillingError> {
        if let Some(list) = &session.line_items {
            return Ok(list.data.clone());
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| BillingError::Configuration("payments provider not configured".into()))?;

        provider.list_line_items(&session.id).await.map_err(|e| {
            tracing::error!(session_id = %session.id, error = %e, "Failed to fetch line items");
            BillingError::from(e)
        })
    }

    /// Sum the credits bought across `items`. Unmapped items contribute
    /// nothing; a session with no mapped item is a data-integrity problem.
    async fn credits_for_items(
        &self,
        session_id: &str,
        items: &[LineItem],
    ) -> Result<u64, BillingError> {
        let mut total: u64 = 0;

        for item in items {
            let Some(price) = &item.price else {
                tracing::warn!(session_id = %session_id, line_item = %item.id, "Line item has no price");
                continue;
            };

            let product_id = match &price.product {
                Some(product) => Some(product.clone()),
                None => self.prices.product_for_price(&price.id).await,
            };
            let Some(product_id) = product_id.filter(|p| self.catalog.contains(p)) else {
                tracing::warn!(
                    session_id = %session_id,
                    line_item = %item.id,
                    price_id = %price.id,
                    product_id = ?price.product,
                    "Line item does not map to a credit product"
                );
                continue;
            };

            let quantity = item.quantity.unwrap_or(1);
            total = self
                .catalog
                .credits_for(&product_id, quantity)
                .and_then(|credits| total.checked_add(credits))
                .ok_or_else(|| {
                    BillingError::DataIntegrity(format!("credit amount overflows for {session_id}"))
                })?;
        }

        if total == 0 {
            return Err(BillingError::DataIntegrity(
                "no line items map to a credit product".into(),
            ));
        }
        Ok(total)
    }

    /// Run a store operation off the async runtime, bounded by the credit
    /// timeout.
    async fn blocking<T, F>(
        &self,
        operation: &'static str,
        f: F,
    ) -> Result<tokenpay_store::Result<T>, BillingError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Store) -> tokenpay_store::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || f(store.as_ref()));

        match tokio::time::timeout(self.credit_timeout, task).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(join_error)) => Err(BillingError::Storage(format!(
                "{operation} task failed: {join_error}"
            ))),
            Err(_) => {
                tracing::error!(
                    operation = operation,
                    timeout_ms = u64::try_from(self.credit_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Store operation timed out"
                );
                Err(BillingError::Timeout(operation.to_string()))
            }
        }
    }
}

/// The buyer, taken only from the session's client reference.
fn resolve_user(session: &CheckoutSession) -> Result<UserId, BillingError> {
    let reference = session
        .client_reference_id
        .as_deref()
        .ok_or_else(|| BillingError::DataIntegrity("missing client_reference_id".into()))?;

    reference
        .parse()
        .map_err(|e| BillingError::DataIntegrity(format!("invalid client_reference_id: {e}")))
}
