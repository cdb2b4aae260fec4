//! Common test utilities for tokenpay integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestResponse, TestServer};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tempfile::TempDir;

use tokenpay_service::crypto::signature_header;
use tokenpay_service::stripe::{CheckoutSession, LineItem, Price, StripeError};
use tokenpay_service::{create_router, AppState, CheckoutRequest, PaymentsProvider, ServiceConfig};
use tokenpay_store::{RocksStore, Store};

pub const WEBHOOK_SECRET: &str = "whsec_test_harness";
pub const JWT_SECRET: &str = "jwt-test-harness";
pub const FRONTEND_URL: &str = "http://localhost:3000";

/// $5 pack.
pub const PROD_5: &str = "prod_5";
/// $10 pack.
pub const PROD_10: &str = "prod_10";

/// In-process payments provider.
#[derive(Default)]
pub struct FakeProvider {
    /// Active price per product.
    pub prices: HashMap<String, String>,
    /// Line items returned for any session.
    pub line_items: Mutex<Vec<LineItem>>,
    /// Checkout sessions requested so far.
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
    pub price_lookups: AtomicUsize,
    pub line_item_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            prices: HashMap::from([
                (PROD_5.to_string(), "price_5".to_string()),
                (PROD_10.to_string(), "price_10".to_string()),
            ]),
            ..Self::default()
        }
    }

    pub fn price_lookups(&self) -> usize {
        self.price_lookups.load(Ordering::SeqCst)
    }

    pub fn line_item_calls(&self) -> usize {
        self.line_item_calls.load(Ordering::SeqCst)
    }

    pub fn last_checkout(&self) -> Option<CheckoutRequest> {
        self.checkouts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentsProvider for FakeProvider {
    async fn first_active_price(&self, product_id: &str) -> Result<Option<Price>, StripeError> {
        self.price_lookups.fetch_add(1, Ordering::SeqCst);
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
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let mut checkouts = self.checkouts.lock().unwrap();
        checkouts.push(request.clone());
        let id = format!("cs_test_{}", checkouts.len());
        Ok(serde_json::from_value(json!({
            "id": id,
            "url": format!("https://checkout.stripe.com/c/pay/{id}"),
            "payment_status": "unpaid",
            "client_reference_id": request.user_id.as_str(),
        }))
        .unwrap())
    }

    async fn list_line_items(&self, _session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        self.line_item_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.line_items.lock().unwrap().clone())
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the store for assertions.
    pub store: Arc<RocksStore>,
    /// The fake payments provider behind the server.
    pub provider: Arc<FakeProvider>,
    /// Temporary directory for the database (kept alive for test duration).
    pub temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness, adjusting the default test configuration first.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::build(temp_dir, Arc::new(FakeProvider::new()), adjust)
    }

    /// Close the store and start a fresh server on the same database.
    pub fn restart(self) -> Self {
        let Self {
            server,
            store,
            provider,
            temp_dir,
        } = self;
        drop(server);
        drop(store);
        Self::build(temp_dir, provider, |_| {})
    }

    fn build(
        temp_dir: TempDir,
        provider: Arc<FakeProvider>,
        adjust: impl FnOnce(&mut ServiceConfig),
    ) -> Self {
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            jwt_secret: Some(JWT_SECRET.into()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            frontend_url: FRONTEND_URL.into(),
            product_credits: "prod_5=5000000,prod_10=10000000,prod_25=25000000"
                .parse()
                .expect("valid product table"),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let dyn_provider: Arc<dyn PaymentsProvider> = provider.clone();
        let state = AppState::with_provider(store.clone(), config, Some(dyn_provider));
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store,
            provider,
            temp_dir,
        }
    }

    /// Current token credits for `user`, if a balance record exists.
    pub fn balance(&self, user: &str) -> Option<u64> {
        self.store
            .get_balance(&user.parse().unwrap())
            .unwrap()
            .map(|b| b.token_credits)
    }

    /// Whether a checkout session has been credited.
    pub fn is_processed(&self, session_id: &str) -> bool {
        self.store
            .get_processed_payment(session_id)
            .unwrap()
            .is_some()
    }

    /// Deliver `event` to the webhook endpoint with a valid signature.
    pub async fn deliver(&self, event: &Value) -> TestResponse {
        let body = serde_json::to_vec(event).unwrap();
        let header = signature_header(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &body)
            .unwrap();
        self.deliver_raw(body, &header).await
    }

    /// Deliver raw bytes with an explicit signature header.
    pub async fn deliver_raw(&self, body: Vec<u8>, signature: &str) -> TestResponse {
        self.server
            .post("/api/payments/webhook")
            .add_header(
                HeaderName::from_static("stripe-signature"),
                HeaderValue::from_str(signature).unwrap(),
            )
            .bytes(Bytes::from(body))
            .await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Authorization header name.
pub fn authorization() -> HeaderName {
    HeaderName::from_static("authorization")
}

/// Bearer token header value for `user`.
pub fn bearer(user: &str) -> HeaderValue {
    let claims = json!({ "sub": user, "exp": chrono::Utc::now().timestamp() + 3_600 });
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

/// A `checkout.session.completed` event for a paid session.
pub fn checkout_completed(event_id: &str, session_id: &str, user: &str, product: &str) -> Value {
    json!({
        "id": event_id,
        "object": "event",
        "type": "checkout.session.completed",
        "created": 1_700_000_000,
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid",
                "status": "complete",
                "client_reference_id": user,
                "amount_total": 500,
                "line_items": {
                    "object": "list",
                    "data": [{
                        "id": format!("li_{session_id}"),
                        "quantity": 1,
                        "price": { "id": format!("price_for_{product}"), "product": product }
                    }],
                    "has_more": false
                }
            }
        }
    })
}
