//! Hosted checkout session creation.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use tokenpay_core::BillingError;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::provider::CheckoutRequest;
use crate::state::AppState;

/// Placeholder the provider replaces with the session id on redirect.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Create checkout session request.
///
/// Only `productId` and `metadata.returnUrl` are read; anything else the
/// client sends (user ids, amounts) is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    /// Catalog product to buy.
    pub product_id: String,
    /// Client-supplied extras.
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

/// Client metadata for a checkout.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    /// Where to send the buyer afterwards.
    #[serde(default)]
    pub return_url: Option<String>,
}

/// Create checkout session response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutResponse {
    /// Provider session ID.
    pub session_id: String,
    /// Hosted checkout URL to redirect the buyer to.
    pub url: String,
}

/// Start a hosted checkout for one unit of a catalog product.
pub async fn create_checkout_session(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let provider = state
        .provider
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Stripe not configured".into()))?;

    if !state.config.product_credits.contains(&request.product_id) {
        return Err(ApiError::BadRequest(format!(
            "Unknown product: {}",
            request.product_id
        )));
    }

    let price_id = state.prices.resolve_price(&request.product_id).await?;

    let (success_url, cancel_url) = redirect_urls(
        &state.config.frontend_url,
        request.metadata.return_url.as_deref(),
    );

    let checkout = CheckoutRequest {
        product_id: request.product_id,
        price_id,
        quantity: 1,
        user_id: auth.user_id,
        success_url,
        cancel_url,
    };

    let session = provider
        .create_checkout_session(&checkout)
        .await
        .map_err(BillingError::from)?;

    let url = session.url.ok_or_else(|| {
        ApiError::ExternalService(format!("checkout session {} has no URL", session.id))
    })?;

    tracing::info!(
        user_id = %checkout.user_id,
        product_id = %checkout.product_id,
        session_id = %session.id,
        "Created Stripe checkout session"
    );

    Ok(Json(CreateCheckoutResponse {
        session_id: session.id,
        url,
    }))
}

/// Success and cancel URLs for a checkout.
///
/// A `return_url` outside the frontend origin is ignored so checkout cannot be
/// used as an open redirect.
fn redirect_urls(frontend_url: &str, return_url: Option<&str>) -> (String, String) {
    let frontend_url = frontend_url.trim_end_matches('/');

    match return_url.filter(|url| is_under(url, frontend_url)) {
        Some(url) => {
            // The query has to precede any fragment.
            let (base, fragment) = url.find('#').map_or((url, ""), |i| url.split_at(i));
            let separator = if base.contains('?') { '&' } else { '?' };
            (
                format!("{base}{separator}session_id={SESSION_ID_PLACEHOLDER}{fragment}"),
                url.to_string(),
            )
        }
        None => {
            if let Some(rejected) = return_url {
                tracing::warn!(return_url = %rejected, "Ignoring return URL outside frontend");
            }
            (
                format!("{frontend_url}/success?session_id={SESSION_ID_PLACEHOLDER}"),
                format!("{frontend_url}/cancel"),
            )
        }
    }
}

fn is_under(url: &str, base: &str) -> bool {
    url.strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONTEND: &str = "https://app.example.com";

    #[test]
    fn defaults_without_return_url() {
        let (success, cancel) = redirect_urls(FRONTEND, None);
        assert_eq!(
            success,
            "https://app.example.com/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(cancel, "https://app.example.com/cancel");
    }

    #[test]
    fn uses_return_url_under_frontend() {
        let (success, cancel) = redirect_urls(FRONTEND, Some("https://app.example.com/billing"));
        assert_eq!(
            success,
            "https://app.example.com/billing?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(cancel, "https://app.example.com/billing");

        let (success, _) = redirect_urls(FRONTEND, Some("https://app.example.com/b?tab=tokens"));
        assert_eq!(
            success,
            "https://app.example.com/b?tab=tokens&session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn session_id_goes_before_fragment() {
        let (success, cancel) =
            redirect_urls(FRONTEND, Some("https://app.example.com/billing#tokens"));
        assert_eq!(
            success,
            "https://app.example.com/billing?session_id={CHECKOUT_SESSION_ID}#tokens"
        );
        assert_eq!(cancel, "https://app.example.com/billing#tokens");

        let (success, _) = redirect_urls(FRONTEND, Some("https://app.example.com/b?tab=1#top"));
        assert_eq!(
            success,
            "https://app.example.com/b?tab=1&session_id={CHECKOUT_SESSION_ID}#top"
        );
    }

    #[test]
    fn ignores_foreign_return_url() {
        for foreign in [
            "https://evil.example.net/phish",
            "https://app.example.com.evil.net/",
            "javascript:alert(1)",
        ] {
            let (_, cancel) = redirect_urls(FRONTEND, Some(foreign));
            assert_eq!(cancel, "https://app.example.com/cancel", "{foreign}");
        }
    }

    #[test]
    fn request_ignores_client_user_and_amount() {
        let request: CreateCheckoutRequest = serde_json::from_value(serde_json::json!({
            "productId": "prod_5",
            "metadata": { "userId": "someone-else", "amount": 1, "returnUrl": "https://x" }
        }))
        .unwrap();
        assert_eq!(request.product_id, "prod_5");
        assert_eq!(request.metadata.return_url.as_deref(), Some("https://x"));
    }
}
