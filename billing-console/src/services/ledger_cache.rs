//! Read-through cache of cycle ledger summaries.
//!
//! Entries are whole-snapshot replacements fetched from the gateway; no code
//! path merges or recomputes a cached balance.

use std::collections::HashMap;
use std::sync::Arc;

use console_core::error::GatewayError;
use console_core::gateway::BillingGateway;
use tokio::sync::RwLock;

use crate::models::CycleLedger;

pub struct CycleLedgerCache {
    gateway: Arc<dyn BillingGateway>,
    entries: RwLock<HashMap<i64, Arc<CycleLedger>>>,
}

impl CycleLedgerCache {
    pub fn new(gateway: Arc<dyn BillingGateway>) -> Self {
        Self {
            gateway,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached snapshot only; no fetch.
    pub async fn get(&self, cycle_id: i64) -> Option<Arc<CycleLedger>> {
        self.entries.read().await.get(&cycle_id).cloned()
    }

    /// Cached snapshot, fetching on a miss.
    pub async fn load(&self, cycle_id: i64) -> Result<Arc<CycleLedger>, GatewayError> {
        if let Some(hit) = self.get(cycle_id).await {
            return Ok(hit);
        }
        self.refresh(cycle_id).await
    }

    /// Always fetch; the returned snapshot replaces the entry wholesale.
    pub async fn refresh(&self, cycle_id: i64) -> Result<Arc<CycleLedger>, GatewayError> {
        let dto = self.gateway.cycle_ledger(cycle_id).await?;
        let ledger = Arc::new(CycleLedger::try_from(dto)?);
        self.entries.write().await.insert(cycle_id, ledger.clone());
        Ok(ledger)
    }

    pub async fn invalidate(&self, cycle_id: i64) {
        self.entries.write().await.remove(&cycle_id);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
