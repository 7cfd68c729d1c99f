//! Console assembly: wires the gateways, cache, change bus, and overview
//! loader together and opens controller sessions against them.

use std::sync::Arc;

use console_core::gateway::{
    BillingGateway, BillingGatewayConfig, HttpBillingGateway, HttpRoleGateway, RoleGateway,
    RoleGatewayConfig,
};

use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::services::collection::CollectionSession;
use crate::services::events::ChangeBus;
use crate::services::ledger_cache::CycleLedgerCache;
use crate::services::overview::OverviewLoader;
use crate::services::payment_session::PaymentSession;
use crate::services::roles::OperatorRole;

pub struct Console {
    gateway: Arc<dyn BillingGateway>,
    roles: Arc<dyn RoleGateway>,
    pub cache: Arc<CycleLedgerCache>,
    pub bus: ChangeBus,
    pub overview: Arc<OverviewLoader>,
}

impl Console {
    /// Build against the configured HTTP gateways.
    pub async fn build(config: ConsoleConfig) -> Self {
        let gateway: Arc<dyn BillingGateway> = Arc::new(HttpBillingGateway::new(
            BillingGatewayConfig {
                base_url: config.common.billing_gateway_url.clone(),
            },
        ));
        let roles: Arc<dyn RoleGateway> = Arc::new(HttpRoleGateway::new(RoleGatewayConfig {
            base_url: config.common.auth_gateway_url.clone(),
        }));
        Self::with_gateways(gateway, roles, config.cycle_page_size).await
    }

    /// Build against caller-supplied gateways. Tests use this with in-memory
    /// fakes.
    pub async fn with_gateways(
        gateway: Arc<dyn BillingGateway>,
        roles: Arc<dyn RoleGateway>,
        cycle_page_size: usize,
    ) -> Self {
        let cache = Arc::new(CycleLedgerCache::new(gateway.clone()));
        let bus = ChangeBus::new();
        let overview = Arc::new(OverviewLoader::with_page_size(
            gateway.clone(),
            cache.clone(),
            cycle_page_size,
        ));
        overview.attach(&bus);
        Self {
            gateway,
            roles,
            cache,
            bus,
            overview,
        }
    }

    /// Open a cycle-detail payment session for an operator.
    pub async fn open_payment_session(
        &self,
        role: OperatorRole,
        customer_id: i64,
        cycle_id: i64,
    ) -> Result<PaymentSession, ConsoleError> {
        PaymentSession::open(
            self.gateway.clone(),
            self.cache.clone(),
            self.bus.clone(),
            self.roles.as_ref(),
            role,
            customer_id,
            cycle_id,
        )
        .await
    }

    /// Open a manual collection-order session for a customer.
    pub async fn open_collection_session(
        &self,
        customer_id: i64,
    ) -> Result<CollectionSession, ConsoleError> {
        CollectionSession::open(self.gateway.clone(), self.bus.clone(), customer_id).await
    }
}
