//! Auth role-gate client.
//!
//! Used only to decide which actions the console exposes; the gateway stays
//! authoritative for actual enforcement.

use async_trait::async_trait;
use reqwest::Client;

use super::billing::check_status;
use super::types::RoleModulesDto;
use crate::error::GatewayError;

#[async_trait]
pub trait RoleGateway: Send + Sync {
    /// Modules exposed to the given role.
    async fn role_modules(&self, role: &str) -> Result<Vec<String>, GatewayError>;
}

#[derive(Clone, Debug)]
pub struct RoleGatewayConfig {
    pub base_url: String,
}

impl Default for RoleGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8082/api".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct HttpRoleGateway {
    http: Client,
    base_url: String,
}

impl HttpRoleGateway {
    pub fn new(config: RoleGatewayConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn connect(base_url: &str) -> Self {
        Self::new(RoleGatewayConfig {
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl RoleGateway for HttpRoleGateway {
    async fn role_modules(&self, role: &str) -> Result<Vec<String>, GatewayError> {
        let response = self
            .http
            .get(format!("{}/auth/roles/{}/modules", self.base_url, role))
            .send()
            .await?;
        let response = check_status(response).await?;
        let dto = response.json::<RoleModulesDto>().await?;
        Ok(dto.modules)
    }
}
