//! Configuration for the collections console.

use console_core::config as core_config;
use console_core::error::CoreError;
use std::env;

use crate::services::overview::DEFAULT_CYCLE_PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub common: core_config::Config,
    /// Passed to `init_tracing` by the embedding shell.
    pub service_name: String,
    pub cycle_page_size: usize,
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, CoreError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "billing-console".to_string()),
            cycle_page_size: env::var("CYCLE_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CYCLE_PAGE_SIZE),
        })
    }
}
