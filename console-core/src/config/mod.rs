use crate::error::CoreError;
use config::{Config as Cfg, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_billing_gateway_url")]
    pub billing_gateway_url: String,
    #[serde(default = "default_auth_gateway_url")]
    pub auth_gateway_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_billing_gateway_url() -> String {
    "http://localhost:8081/api".to_string()
}

fn default_auth_gateway_url() -> String {
    "http://localhost:8082/api".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("CONSOLE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
