//! Stripe webhook endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the delivery signature.
const SIGNATURE_HEADER: &str = "stripe-signature";

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
    /// How the event was handled (`credited`, `duplicate`, `ignored`, `skipped`).
    pub outcome: &'static str,
}

/// Handle Stripe webhooks.
///
/// The raw body is verified before anything is parsed. Any error response
/// tells Stripe to redeliver; acknowledged events are never retried.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| ApiError::Internal("Stripe webhook secret not configured".into()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Webhook("Missing Stripe-Signature header".into()))?;

    let outcome = state
        .ledger
        .process(&body, signature, secret)
        .await
        .map_err(|e| {
            if e.is_retryable() {
                tracing::error!(error = %e, "Webhook processing failed; awaiting redelivery");
            }
            ApiError::from(e)
        })?;

    Ok(Json(WebhookResponse {
        received: true,
        outcome: outcome.label(),
    }))
}
