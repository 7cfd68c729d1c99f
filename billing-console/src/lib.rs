//! billing-console: payment reconciliation and manual collection-order core
//! for the subscription-delivery admin console.
//!
//! The remote billing gateway owns every balance and status; this crate
//! orchestrates the operator workflows on top of it and re-fetches instead of
//! recomputing after every mutation.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod startup;
