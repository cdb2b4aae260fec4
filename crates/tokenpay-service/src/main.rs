//! `tokenpay` binary: loads config from the environment, opens the store,
//! warms the price cache and serves HTTP until killed.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokenpay_service::{create_router, AppState, ServiceConfig};
use tokenpay_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tokenpay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tokenpay starting");

    let config = ServiceConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        stripe_configured = %config.stripe_api_key.is_some(),
        webhook_secret_configured = %config.stripe_webhook_secret.is_some(),
        jwt_configured = %config.jwt_secret.is_some(),
        products = config.product_credits.len(),
        "Configuration loaded"
    );

    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    let state = AppState::new(store, config.clone())?;

    // Misses are retried lazily on first checkout.
    let warmed = state
        .prices
        .warm(config.product_credits.product_ids())
        .await;
    tracing::info!(
        warmed = warmed,
        products = config.product_credits.len(),
        "Price cache warmed"
    );

    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Listening");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
