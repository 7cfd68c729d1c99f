//! Typed clients for the remote billing gateway and the auth role gate.

pub mod auth;
pub mod billing;
pub mod types;

pub use auth::{HttpRoleGateway, RoleGateway, RoleGatewayConfig};
pub use billing::{BillingGateway, BillingGatewayConfig, HttpBillingGateway};
