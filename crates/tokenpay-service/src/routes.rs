//! HTTP surface: user routes behind a concurrency cap, the webhook, health.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{balance, checkout, health, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for user-facing API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Payments (JWT auth, rate-limited)
/// - `POST /api/payments/create-checkout-session` - Start a hosted checkout
/// - `GET /api/balance` - Current token balance
/// - `GET /api/balance/transactions` - Purchase history
///
/// ## Webhooks (Signature verification)
/// - `POST /api/payments/webhook` - Stripe webhooks
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        .route(
            "/api/payments/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/api/balance", get(balance::get_balance))
        .route("/api/balance/transactions", get(balance::list_transactions))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .merge(api_routes)
        // Webhooks (no rate limit - the provider controls delivery)
        .route("/api/payments/webhook", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// CORS for the browser-facing routes: bearer-authenticated JSON over GET and
/// POST. The webhook is server-to-server and needs none of this.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(allowed)
}
