//! Change signal shared by the controllers.
//!
//! Mutations publish; the overview aggregator reloads. No payload beyond the
//! touched identifiers: listeners re-fetch, they never patch.

use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentChanged {
    pub customer_id: Option<i64>,
    pub cycle_id: Option<i64>,
}

#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<PaymentChanged>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentChanged> {
        self.tx.subscribe()
    }

    /// Publishing with no listeners is fine; the event is simply dropped.
    pub fn publish(&self, event: PaymentChanged) {
        let _ = self.tx.send(event);
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
