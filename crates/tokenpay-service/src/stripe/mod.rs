//! Stripe integration for checkout and webhook payloads.
//!
//! Stripe handles:
//! - Price lookup for catalog products
//! - Hosted Checkout sessions
//! - Line items of completed sessions

pub mod client;
pub mod types;

pub use client::StripeClient;
pub use client::StripeError;
pub use types::*;
