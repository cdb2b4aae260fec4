//! API handlers.

pub mod balance;
pub mod checkout;
pub mod health;
pub mod webhooks;
