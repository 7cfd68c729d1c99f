//! Customer payment overview aggregation.
//!
//! Loads every active subscription of a customer, then the ledger summary of
//! every cycle, producing one independently paginated panel per subscription.
//! A payment mutation anywhere triggers a full reload; derived fields are
//! never recomputed client-side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use console_core::gateway::BillingGateway;
use futures::future::join_all;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, RwLock};

use crate::error::ConsoleError;
use crate::models::{CycleLedger, CycleRef, Subscription};
use crate::services::events::ChangeBus;
use crate::services::ledger_cache::CycleLedgerCache;

pub const DEFAULT_CYCLE_PAGE_SIZE: usize = 5;

/// One cycle with its last ledger snapshot. `ledger.unavailable` marks rows
/// whose fetch failed and degraded to the empty stub.
#[derive(Debug, Clone)]
pub struct CycleRow {
    pub cycle: CycleRef,
    pub ledger: Arc<CycleLedger>,
}

#[derive(Debug, Clone)]
pub struct SubscriptionPanel {
    pub subscription: Subscription,
    rows: Vec<CycleRow>,
    page: usize,
    page_size: usize,
}

impl SubscriptionPanel {
    fn new(subscription: Subscription, rows: Vec<CycleRow>, page_size: usize) -> Self {
        Self {
            subscription,
            rows,
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn rows(&self) -> &[CycleRow] {
        &self.rows
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        if self.rows.is_empty() {
            1
        } else {
            self.rows.len().div_ceil(self.page_size)
        }
    }

    /// The rows on the current page.
    pub fn visible(&self) -> &[CycleRow] {
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(self.rows.len());
        &self.rows[start.min(self.rows.len())..end]
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }
}

#[derive(Debug, Clone)]
pub struct CustomerOverview {
    pub customer_id: i64,
    pub panels: Vec<SubscriptionPanel>,
}

#[derive(Debug, Clone)]
pub enum OverviewState {
    Idle,
    Loading,
    Ready(CustomerOverview),
    Failed(String),
}

pub struct OverviewLoader {
    gateway: Arc<dyn BillingGateway>,
    cache: Arc<CycleLedgerCache>,
    page_size: usize,
    // Liveness epoch: bumped by every load and by close. A load applies its
    // results only while it still owns the current epoch.
    epoch: AtomicU64,
    customer: RwLock<Option<i64>>,
    state_tx: watch::Sender<OverviewState>,
}

impl OverviewLoader {
    pub fn new(gateway: Arc<dyn BillingGateway>, cache: Arc<CycleLedgerCache>) -> Self {
        Self::with_page_size(gateway, cache, DEFAULT_CYCLE_PAGE_SIZE)
    }

    pub fn with_page_size(
        gateway: Arc<dyn BillingGateway>,
        cache: Arc<CycleLedgerCache>,
        page_size: usize,
    ) -> Self {
        let (state_tx, _) = watch::channel(OverviewState::Idle);
        Self {
            gateway,
            cache,
            page_size,
            epoch: AtomicU64::new(0),
            customer: RwLock::new(None),
            state_tx,
        }
    }

    /// Observable view state. A fetch failure lands in `Failed`, never a
    /// stuck `Loading`.
    pub fn state(&self) -> watch::Receiver<OverviewState> {
        self.state_tx.subscribe()
    }

    /// Load the full overview for a customer. Returns `Ok(None)` when the
    /// invocation was superseded before completing; its partial results are
    /// discarded rather than applied to a now-irrelevant view.
    pub async fn load(
        &self,
        customer_id: i64,
    ) -> Result<Option<CustomerOverview>, ConsoleError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.customer.write().await = Some(customer_id);
        self.publish(epoch, OverviewState::Loading);

        let subscriptions = match self.gateway.subscriptions(customer_id).await {
            Ok(dtos) => dtos,
            Err(e) => {
                self.publish(epoch, OverviewState::Failed(e.to_string()));
                return Err(e.into());
            }
        };
        if !self.live(epoch) {
            return Ok(None);
        }

        let mut panels = Vec::with_capacity(subscriptions.len());
        for dto in subscriptions {
            let subscription = match Subscription::try_from(dto) {
                Ok(subscription) => subscription,
                Err(e) => {
                    self.publish(epoch, OverviewState::Failed(e.to_string()));
                    return Err(e.into());
                }
            };
            let rows = self.load_rows(&subscription).await;
            if !self.live(epoch) {
                return Ok(None);
            }
            panels.push(SubscriptionPanel::new(subscription, rows, self.page_size));
        }

        let overview = CustomerOverview {
            customer_id,
            panels,
        };
        if !self.live(epoch) {
            return Ok(None);
        }
        self.publish(epoch, OverviewState::Ready(overview.clone()));
        Ok(Some(overview))
    }

    /// Per-cycle fetches run independently; one failure degrades that row to
    /// the empty stub without touching the rest.
    async fn load_rows(&self, subscription: &Subscription) -> Vec<CycleRow> {
        let fetches = subscription.cycles.iter().map(|cycle| async move {
            let ledger = match self.cache.refresh(cycle.cycle_id).await {
                Ok(ledger) => ledger,
                Err(e) => {
                    tracing::warn!(
                        cycle_id = cycle.cycle_id,
                        subscription_id = subscription.subscription_id,
                        error = %e,
                        "cycle ledger fetch failed, rendering stub"
                    );
                    Arc::new(CycleLedger::unavailable(cycle.cycle_id))
                }
            };
            CycleRow {
                cycle: cycle.clone(),
                ledger,
            }
        });
        join_all(fetches).await
    }

    /// Tear the view down: in-flight loads are superseded and discarded.
    pub async fn close(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.customer.write().await = None;
        let _ = self.state_tx.send(OverviewState::Idle);
    }

    /// Reload the open customer whenever a payment mutation is signalled.
    pub fn attach(self: &Arc<Self>, bus: &ChangeBus) -> tokio::task::JoinHandle<()> {
        let loader = Arc::clone(self);
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(_event) => {
                        let customer = *loader.customer.read().await;
                        if let Some(customer_id) = customer {
                            if let Err(e) = loader.load(customer_id).await {
                                tracing::warn!(
                                    customer_id,
                                    error = %e,
                                    "overview reload after payment change failed"
                                );
                            }
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn live(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn publish(&self, epoch: u64, state: OverviewState) {
        if self.live(epoch) {
            let _ = self.state_tx.send(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentMode, Subscription};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn panel(cycle_count: usize, page_size: usize) -> SubscriptionPanel {
        let subscription = Subscription {
            subscription_id: 1,
            customer_id: 1,
            plan_name: "Plan".to_string(),
            start_date: date(2026, 1, 1),
            collection_day: 5,
            payment_mode: PaymentMode::Advance,
            cycles: Vec::new(),
        };
        let rows = (0..cycle_count)
            .map(|i| CycleRow {
                cycle: CycleRef {
                    cycle_id: i as i64,
                    cycle_number: i as u32 + 1,
                    period_start: date(2026, 1, 1),
                    period_end: date(2026, 1, 31),
                    payment_due_date: date(2026, 2, 5),
                },
                ledger: Arc::new(CycleLedger::unavailable(i as i64)),
            })
            .collect();
        SubscriptionPanel::new(subscription, rows, page_size)
    }

    #[test]
    fn pagination_splits_rows() {
        let mut p = panel(7, 5);
        assert_eq!(p.page_count(), 2);
        assert_eq!(p.visible().len(), 5);
        p.next_page();
        assert_eq!(p.visible().len(), 2);
        p.next_page();
        assert_eq!(p.page(), 1);
        p.prev_page();
        assert_eq!(p.page(), 0);
    }

    #[test]
    fn empty_panel_has_one_empty_page() {
        let p = panel(0, 5);
        assert_eq!(p.page_count(), 1);
        assert!(p.visible().is_empty());
    }

    #[test]
    fn set_page_clamps_to_last() {
        let mut p = panel(6, 5);
        p.set_page(99);
        assert_eq!(p.page(), 1);
    }
}
