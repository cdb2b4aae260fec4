//! Core types and utilities for tokenpay.
//!
//! This crate provides the foundational types shared by the store and the
//! HTTP service:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Balances**: `BalanceRecord`
//! - **Ledger**: `CreditTransaction`, `ProcessedPayment`
//! - **Catalog**: `ProductCreditTable`
//! - **Errors**: `BillingError`
//!
//! # Token Credit Unit
//!
//! **1,000,000 token credits = $1.00**
//!
//! - User buys the $5 product → gets 5,000,000 credits
//! - Stored as `u64` so a balance can never go negative

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod balance;
pub mod catalog;
pub mod credits;
pub mod error;
pub mod ids;

pub use balance::{format_credits_as_usd, BalanceRecord, CREDITS_PER_USD};
pub use catalog::{CatalogError, ProductCreditTable};
pub use credits::{CreditTransaction, ProcessedPayment};
pub use error::{BillingError, Result};
pub use ids::{IdError, TransactionId, UserId};
