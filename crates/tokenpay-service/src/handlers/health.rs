//! Liveness probe.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// False when no Stripe key is configured; checkout requests will fail.
    pub checkout_enabled: bool,
}

/// `GET /health`. Unauthenticated and never touches the store.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "tokenpay",
        version: env!("CARGO_PKG_VERSION"),
        checkout_enabled: state.has_stripe(),
    })
}
