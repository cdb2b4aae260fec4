//! Tokenpay HTTP API Service.
//!
//! This crate sells prepaid token credits through Stripe Checkout:
//!
//! - Hosted checkout sessions for catalog products
//! - Signed webhook processing that credits each paid session exactly once
//! - Token balance and purchase history
//!
//! # Authentication
//!
//! End-user routes take an HS256 bearer token. The webhook route is
//! authenticated by the Stripe signature over the raw request body.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod prices;
pub mod provider;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use ledger::{LedgerUpdater, WebhookOutcome};
pub use prices::PriceResolver;
pub use provider::{CheckoutRequest, PaymentsProvider};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
