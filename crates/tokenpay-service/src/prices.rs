//! Product → price resolution with an in-process cache.
//!
//! Prices are looked up once per product and then served from memory for the
//! life of the process. Entries are never invalidated: a product's active
//! price is assumed stable while the service runs, and a restart repopulates
//! the cache lazily.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;

use tokenpay_core::BillingError;

use crate::provider::PaymentsProvider;

/// Resolves catalog products to chargeable provider prices.
pub struct PriceResolver {
    provider: Option<Arc<dyn PaymentsProvider>>,
    cache: RwLock<HashMap<String, String>>,
}

impl PriceResolver {
    /// Create a resolver with an empty cache.
    #[must_use]
    pub fn new(provider: Option<Arc<dyn PaymentsProvider>>) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Populate the cache for `product_ids`, returning how many resolved.
    ///
    /// Failures are logged and left for the next lookup to retry.
    pub async fn warm<'a>(&self, product_ids: impl IntoIterator<Item = &'a str>) -> usize {
        let results = join_all(product_ids.into_iter().map(|product_id| async move {
            (product_id, self.resolve_price(product_id).await)
        }))
        .await;

        let mut resolved = 0;
        for (product_id, result) in results {
            match result {
                Ok(price_id) => {
                    resolved += 1;
                    tracing::debug!(product_id = %product_id, price_id = %price_id, "Price cached");
                }
                Err(e) => {
                    tracing::warn!(
                        product_id = %product_id,
                        error = %e,
                        "Failed to warm price cache; will retry on first lookup"
                    );
                }
            }
        }
        resolved
    }

    /// Resolve the price to charge for `product_id`.
    ///
    /// # Errors
    ///
    /// - `BillingError::NotFound` if the product has no active price.
    /// - `BillingError::TransientProvider` / `ExternalService` if the lookup
    ///   fails.
    /// - `BillingError::Configuration` if no provider is configured.
    pub async fn resolve_price(&self, product_id: &str) -> Result<String, BillingError> {
        if let Some(price_id) = self.cached_price(product_id).await {
            return Ok(price_id);
        }

        // Concurrent misses for one product may both reach the provider; the
        // cache write is idempotent.
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| BillingError::Configuration("payments provider not configured".into()))?;

        let price = provider
            .first_active_price(product_id)
            .await?
            .ok_or_else(|| BillingError::NotFound {
                entity: "active price",
                id: product_id.to_string(),
            })?;

        let price_id = self
            .cache
            .write()
            .await
            .entry(product_id.to_string())
            .or_insert(price.id)
            .clone();

        Ok(price_id)
    }

    /// The cached price for `product_id`, without contacting the provider.
    pub async fn cached_price(&self, product_id: &str) -> Option<String> {
        self.cache.read().await.get(product_id).cloned()
    }

    /// Reverse lookup: the cached product whose price is `price_id`.
    pub async fn product_for_price(&self, price_id: &str) -> Option<String> {
        self.cache
            .read()
            .await
            .iter()
            .find(|(_, cached)| cached.as_str() == price_id)
            .map(|(product_id, _)| product_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::provider::CheckoutRequest;
    use crate::stripe::{CheckoutSession, LineItem, Price, StripeError};

    /// Provider fake that counts price lookups.
    #[derive(Default)]
    struct CountingProvider {
        prices: HashMap<String, String>,
        failing: bool,
        lookups: AtomicUsize,
    }

    impl CountingProvider {
        fn with_price(product_id: &str, price_id: &str) -> Self {
            Self {
                prices: HashMap::from([(product_id.to_string(), price_id.to_string())]),
                ..Self::default()
            }
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentsProvider for CountingProvider {
        async fn first_active_price(&self, product_id: &str) -> Result<Option<Price>, StripeError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(StripeError::Api {
                    status: 503,
                    error_type: "api_error".into(),
                    message: "unavailable".into(),
                    code: None,
                });
            }
            Ok(self.prices.get(product_id).map(|id| Price {
                id: id.clone(),
                product: Some(product_id.to_string()),
                active: true,
                unit_amount: Some(500),
                currency: Some("usd".into()),
            }))
        }

        async fn create_checkout_session(
            &self,
            _request: &CheckoutRequest,
        ) -> Result<CheckoutSession, StripeError> {
            unreachable!("price resolver never creates sessions")
        }

        async fn list_line_items(&self, _session_id: &str) -> Result<Vec<LineItem>, StripeError> {
            unreachable!("price resolver never lists line items")
        }
    }

    fn resolver(provider: &Arc<CountingProvider>) -> PriceResolver {
        let provider: Arc<dyn PaymentsProvider> = provider.clone();
        PriceResolver::new(Some(provider))
    }

    #[tokio::test]
    async fn miss_fetches_then_hits_cache() {
        let provider = Arc::new(CountingProvider::with_price("prod_5", "price_5"));
        let prices = resolver(&provider);

        assert_eq!(prices.resolve_price("prod_5").await.unwrap(), "price_5");
        assert_eq!(provider.lookups(), 1);

        assert_eq!(prices.resolve_price("prod_5").await.unwrap(), "price_5");
        assert_eq!(prices.resolve_price("prod_5").await.unwrap(), "price_5");
        assert_eq!(provider.lookups(), 1);
    }

    #[tokio::test]
    async fn warmed_products_never_hit_provider_again() {
        let provider = Arc::new(CountingProvider::with_price("prod_5", "price_5"));
        let prices = resolver(&provider);

        assert_eq!(prices.warm(["prod_5"]).await, 1);
        assert_eq!(provider.lookups(), 1);

        assert_eq!(prices.resolve_price("prod_5").await.unwrap(), "price_5");
        assert_eq!(provider.lookups(), 1);
    }

    #[tokio::test]
    async fn missing_price_is_not_found_and_not_cached() {
        let provider = Arc::new(CountingProvider::with_price("prod_5", "price_5"));
        let prices = resolver(&provider);

        let err = prices.resolve_price("prod_gone").await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
        assert!(prices.cached_price("prod_gone").await.is_none());

        prices.resolve_price("prod_gone").await.unwrap_err();
        assert_eq!(provider.lookups(), 2);
    }

    #[tokio::test]
    async fn warm_failures_are_not_fatal() {
        let provider = Arc::new(CountingProvider {
            failing: true,
            ..CountingProvider::with_price("prod_5", "price_5")
        });
        let prices = resolver(&provider);

        assert_eq!(prices.warm(["prod_5", "prod_10"]).await, 0);
        assert!(matches!(
            prices.resolve_price("prod_5").await,
            Err(BillingError::TransientProvider(_))
        ));
        assert_eq!(provider.lookups(), 3);
    }

    #[tokio::test]
    async fn reverse_lookup_uses_cache() {
        let provider = Arc::new(CountingProvider::with_price("prod_5", "price_5"));
        let prices = resolver(&provider);

        assert_eq!(prices.product_for_price("price_5").await, None);
        prices.resolve_price("prod_5").await.unwrap();
        assert_eq!(
            prices.product_for_price("price_5").await.as_deref(),
            Some("prod_5")
        );
    }

    #[tokio::test]
    async fn without_provider_is_configuration_error() {
        let prices = PriceResolver::new(None);
        assert!(matches!(
            prices.resolve_price("prod_5").await,
            Err(BillingError::Configuration(_))
        ));
    }
}
