//! Application state.

use std::sync::Arc;

use tokenpay_store::Store;

use crate::config::ServiceConfig;
use crate::ledger::LedgerUpdater;
use crate::prices::PriceResolver;
use crate::provider::PaymentsProvider;
use crate::stripe::{StripeClient, StripeError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Payments provider (optional; checkout is unavailable without it).
    pub provider: Option<Arc<dyn PaymentsProvider>>,

    /// Product → price cache.
    pub prices: Arc<PriceResolver>,

    /// Webhook processor.
    pub ledger: Arc<LedgerUpdater>,
}

impl AppState {
    /// Create application state, connecting to Stripe if a key is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the Stripe client cannot be built.
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Result<Self, StripeError> {
        let provider = match &config.stripe_api_key {
            Some(key) => {
                let client = StripeClient::new(key, &config.stripe_api_base)?;
                tracing::info!(api_base = %config.stripe_api_base, "Stripe integration enabled");
                Some(Arc::new(client) as Arc<dyn PaymentsProvider>)
            }
            None => {
                tracing::warn!("Stripe not configured - checkout will not be available");
                None
            }
        };

        Ok(Self::with_provider(store, config, provider))
    }

    /// Create application state around an explicit provider.
    #[must_use]
    pub fn with_provider(
        store: Arc<dyn Store>,
        config: ServiceConfig,
        provider: Option<Arc<dyn PaymentsProvider>>,
    ) -> Self {
        if config.stripe_webhook_secret.is_none() {
            tracing::warn!("Stripe webhook secret not configured - webhooks will be refused");
        }

        let prices = Arc::new(PriceResolver::new(provider.clone()));
        let ledger = LedgerUpdater::new(
            Arc::clone(&store),
            provider.clone(),
            Arc::clone(&prices),
            config.product_credits.clone(),
        )
        .with_tolerance(config.webhook_tolerance())
        .with_credit_timeout(config.credit_timeout());

        Self {
            store,
            config,
            provider,
            prices,
            ledger: Arc::new(ledger),
        }
    }

    /// Check if Stripe is configured.
    #[must_use]
    pub fn has_stripe(&self) -> bool {
        self.provider.is_some()
    }
}
