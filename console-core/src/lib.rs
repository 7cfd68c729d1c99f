//! console-core: shared infrastructure for the collections console.

pub mod config;
pub mod error;
pub mod gateway;
pub mod observability;

pub use async_trait;
pub use serde;
pub use serde_json;
pub use tracing;
