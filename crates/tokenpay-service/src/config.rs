//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use tokenpay_core::{BillingError, ProductCreditTable};

use crate::crypto;
use crate::ledger::DEFAULT_CREDIT_TIMEOUT;
use crate::stripe::StripeClient;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/tokenpay").
    pub data_dir: String,

    /// HS256 secret for bearer tokens. Authenticated routes fail without it.
    pub jwt_secret: Option<String>,

    /// Stripe API key (optional; checkout is unavailable without it).
    pub stripe_api_key: Option<String>,

    /// Stripe webhook signing secret. Webhooks are refused without it.
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL.
    pub stripe_api_base: String,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Accepted webhook signature age in seconds (0 disables the check).
    pub webhook_tolerance_seconds: u64,

    /// Bound on the atomic credit write, in seconds.
    pub credit_timeout_seconds: u64,

    /// Products that can be bought and the credits each grants.
    pub product_credits: ProductCreditTable,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Configuration` if `PRODUCT_CREDITS` is set but
    /// malformed.
    pub fn from_env() -> Result<Self, BillingError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Secrets file wins over the environment.
        if let Some((api_key, webhook_secret)) = load_stripe_secrets() {
            config.stripe_api_key = Some(api_key);
            if webhook_secret.is_some() {
                config.stripe_webhook_secret = webhook_secret;
            }
        }

        Ok(config)
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, BillingError> {
        let defaults = Self::default();

        let product_credits = match var("PRODUCT_CREDITS") {
            Some(raw) => raw
                .parse()
                .map_err(|e| BillingError::Configuration(format!("PRODUCT_CREDITS: {e}")))?,
            None => defaults.product_credits,
        };

        Ok(Self {
            listen_addr: var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: var("DATA_DIR").unwrap_or(defaults.data_dir),
            jwt_secret: var("JWT_SECRET").filter(|s| !s.is_empty()),
            stripe_api_key: var("STRIPE_API_KEY").filter(|s| !s.is_empty()),
            stripe_webhook_secret: var("STRIPE_WEBHOOK_SECRET").filter(|s| !s.is_empty()),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
            frontend_url: var("FRONTEND_URL")
                .map_or(defaults.frontend_url, |url| url.trim_end_matches('/').to_string()),
            cors_origins: var("CORS_ORIGINS").map_or(defaults.cors_origins, |origins| {
                origins.split(',').map(|s| s.trim().to_string()).collect()
            }),
            max_body_bytes: parse_or(var("MAX_BODY_BYTES"), defaults.max_body_bytes),
            request_timeout_seconds: parse_or(
                var("REQUEST_TIMEOUT_SECONDS"),
                defaults.request_timeout_seconds,
            ),
            webhook_tolerance_seconds: parse_or(
                var("WEBHOOK_TOLERANCE_SECONDS"),
                defaults.webhook_tolerance_seconds,
            ),
            credit_timeout_seconds: parse_or(
                var("CREDIT_TIMEOUT_SECONDS"),
                defaults.credit_timeout_seconds,
            ),
            product_credits,
        })
    }

    /// Accepted webhook signature age.
    #[must_use]
    pub const fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook_tolerance_seconds)
    }

    /// Bound on the atomic credit write.
    #[must_use]
    pub const fn credit_timeout(&self) -> Duration {
        Duration::from_secs(self.credit_timeout_seconds)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Load Stripe secrets from file, if one is present.
fn load_stripe_secrets() -> Option<(String, Option<String>)> {
    let secret_paths = [".secrets/stripe.json", "../.secrets/stripe.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return Some((secrets.api_key, secrets.webhook_secret));
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    None
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/tokenpay".into(),
            jwt_secret: None,
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: StripeClient::DEFAULT_BASE_URL.into(),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            webhook_tolerance_seconds: crypto::DEFAULT_TOLERANCE.as_secs(),
            credit_timeout_seconds: DEFAULT_CREDIT_TIMEOUT.as_secs(),
            product_credits: ProductCreditTable::default(),
        }
    }
}
