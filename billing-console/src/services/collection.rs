//! Manual collection-order composition.
//!
//! One session per customer: pull the outstanding cycles, let the operator
//! select a subset, commit the batch exactly once. The session closes only
//! after the success notice has been acknowledged, so the operator sees the
//! confirmation before the view disappears.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use console_core::gateway::types::CollectionOrderRequestDto;
use console_core::gateway::BillingGateway;
use rust_decimal::Decimal;

use crate::error::{ConsoleError, Notice};
use crate::models::{CollectionOrderReceipt, CustomerInfo, PendingCycle};
use crate::services::events::{ChangeBus, PaymentChanged};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Composing,
    Submitting,
    /// Submitted successfully; waiting for the notice to be acknowledged.
    Closing,
    Closed,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Self::Composing => "composing",
            Self::Submitting => "submitting",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

pub struct CollectionSession {
    gateway: Arc<dyn BillingGateway>,
    bus: ChangeBus,
    customer: CustomerInfo,
    pending: Vec<PendingCycle>,
    total_pending: Decimal,
    selected: BTreeSet<i64>,
    collection_date: NaiveDate,
    notes: Option<String>,
    phase: Phase,
    notice: Option<Notice>,
}

impl CollectionSession {
    /// Open a composition session: fetch the customer's outstanding cycles
    /// and reset selection, notes, and the collection date to today.
    pub async fn open(
        gateway: Arc<dyn BillingGateway>,
        bus: ChangeBus,
        customer_id: i64,
    ) -> Result<Self, ConsoleError> {
        let dto = gateway.pending_cycles(customer_id).await?;
        let today = Utc::now().date_naive();
        let pending = dto
            .pending_cycles
            .into_iter()
            .map(|cycle| PendingCycle::from_dto(cycle, today))
            .collect();
        Ok(Self {
            gateway,
            bus,
            customer: dto.customer_info.into(),
            pending,
            total_pending: dto.total_pending,
            selected: BTreeSet::new(),
            collection_date: today,
            notes: None,
            phase: Phase::Composing,
            notice: None,
        })
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn pending_cycles(&self) -> &[PendingCycle] {
        &self.pending
    }

    /// Total outstanding across all listed cycles, as reported by the ledger.
    pub fn total_pending(&self) -> Decimal {
        self.total_pending
    }

    pub fn selected(&self) -> &BTreeSet<i64> {
        &self.selected
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn collection_date(&self) -> NaiveDate {
        self.collection_date
    }

    pub fn set_collection_date(&mut self, date: NaiveDate) -> Result<(), ConsoleError> {
        self.require_composing("change the collection date")?;
        self.collection_date = date;
        Ok(())
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), ConsoleError> {
        self.require_composing("edit the notes")?;
        self.notes = notes;
        Ok(())
    }

    pub fn toggle_cycle(&mut self, cycle_id: i64) -> Result<(), ConsoleError> {
        self.require_composing("change the selection")?;
        if !self.pending.iter().any(|c| c.cycle_id == cycle_id) {
            return Err(self.reject(ConsoleError::Validation(format!(
                "cycle {} is not pending for this customer",
                cycle_id
            ))));
        }
        if !self.selected.remove(&cycle_id) {
            self.selected.insert(cycle_id);
        }
        Ok(())
    }

    /// If every listed cycle is selected, clear; otherwise select them all.
    pub fn toggle_select_all(&mut self) -> Result<(), ConsoleError> {
        self.require_composing("change the selection")?;
        if !self.pending.is_empty() && self.selected.len() == self.pending.len() {
            self.selected.clear();
        } else {
            self.selected = self.pending.iter().map(|c| c.cycle_id).collect();
        }
        Ok(())
    }

    /// Running total of the current selection. Display only; the committed
    /// total comes back in the receipt.
    pub fn selection_total(&self) -> Decimal {
        self.pending
            .iter()
            .filter(|c| self.selected.contains(&c.cycle_id))
            .map(|c| c.pending_balance)
            .sum()
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Composing && !self.selected.is_empty()
    }

    pub fn can_cancel(&self) -> bool {
        self.phase != Phase::Submitting
    }

    /// Commit the selected cycles as one collection order. Refused with an
    /// empty selection, while a submission is in flight, and after the
    /// session has already committed once.
    pub async fn submit(&mut self) -> Result<CollectionOrderReceipt, ConsoleError> {
        if self.phase != Phase::Composing {
            let state = self.phase.name();
            return Err(self.reject(ConsoleError::State {
                action: "submit",
                state,
            }));
        }
        if self.selected.is_empty() {
            return Err(self.reject(ConsoleError::Validation(
                "no cycles selected".to_string(),
            )));
        }

        self.phase = Phase::Submitting;
        let request = CollectionOrderRequestDto {
            customer_id: self.customer.customer_id,
            selected_cycles: self.selected.iter().copied().collect(),
            collection_date: self.collection_date,
            notes: self.notes.clone(),
        };

        match self.gateway.generate_collection_order(&request).await {
            Ok(dto) => {
                let receipt = CollectionOrderReceipt::from(dto);
                self.bus.publish(PaymentChanged {
                    customer_id: Some(self.customer.customer_id),
                    cycle_id: None,
                });
                self.notice = Some(Notice::Success(receipt.message.clone()));
                self.phase = Phase::Closing;
                Ok(receipt)
            }
            Err(e) => {
                // Selection and notes stay put so the operator can retry.
                self.phase = Phase::Composing;
                Err(self.reject(e.into()))
            }
        }
    }

    /// Deferred close: callable only after a successful submit.
    pub fn acknowledge_close(&mut self) -> Result<(), ConsoleError> {
        if self.phase != Phase::Closing {
            let state = self.phase.name();
            return Err(self.reject(ConsoleError::State {
                action: "close",
                state,
            }));
        }
        self.phase = Phase::Closed;
        Ok(())
    }

    /// Abandon the session. Blocked while a submission is in flight.
    pub fn cancel(&mut self) -> Result<(), ConsoleError> {
        if self.phase == Phase::Submitting {
            return Err(self.reject(ConsoleError::State {
                action: "cancel",
                state: "submitting",
            }));
        }
        self.phase = Phase::Closed;
        Ok(())
    }

    fn require_composing(&mut self, action: &'static str) -> Result<(), ConsoleError> {
        if self.phase == Phase::Composing {
            Ok(())
        } else {
            let state = self.phase.name();
            Err(self.reject(ConsoleError::State { action, state }))
        }
    }

    fn reject(&mut self, err: ConsoleError) -> ConsoleError {
        self.notice = Some(Notice::Error(err.to_string()));
        err
    }
}
