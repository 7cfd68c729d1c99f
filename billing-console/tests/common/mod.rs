//! Shared test fixtures: an in-memory billing gateway that owns the ledger
//! arithmetic, the way the real backend does.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use console_core::error::GatewayError;
use console_core::gateway::types::{
    CollectionOrderReceiptDto, CollectionOrderRequestDto, CustomerInfoDto, CycleLedgerDto,
    CycleRefDto, MutationAudit, NewPaymentDto, PaymentDto, PaymentPatchDto, PendingCycleDto,
    PendingCyclesDto, SubscriptionDto,
};
use console_core::gateway::{BillingGateway, RoleGateway};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,billing_console=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Default)]
pub struct MockState {
    pub subscriptions: HashMap<i64, Vec<SubscriptionDto>>,
    pub ledgers: HashMap<i64, CycleLedgerDto>,
    pub pending: HashMap<i64, PendingCyclesDto>,
    pub modules: HashMap<String, Vec<String>>,

    // Scripted failures.
    pub fail_subscriptions: Option<String>,
    pub failing_cycles: HashSet<i64>,
    pub fail_register: Option<String>,
    pub fail_generate: Option<String>,
    pub fail_roles: bool,
    pub subscriptions_delay: Option<Duration>,

    // Recorded traffic.
    pub ledger_fetches: Vec<i64>,
    pub registered: Vec<NewPaymentDto>,
    pub updated: Vec<(i64, PaymentPatchDto)>,
    pub deleted: Vec<(i64, bool)>,
    pub generated: Vec<CollectionOrderRequestDto>,
    pub role_queries: Vec<String>,

    pub next_payment_id: i64,
    pub next_order_id: i64,
}

/// In-memory stand-in for the remote billing service and the auth role gate.
/// Mutations recompute the affected ledger the way the backend would; the
/// crate under test must only ever see the recomputed values.
#[derive(Default)]
pub struct MockGateway {
    pub state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(f: impl FnOnce(&mut MockState)) -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.state.lock().unwrap();
            state.next_payment_id = 1000;
            state.next_order_id = 1;
            f(&mut state);
        }
        gateway
    }
}

fn remote(message: &str) -> GatewayError {
    GatewayError::Remote {
        status: 500,
        message: message.to_string(),
    }
}

fn not_found(what: String) -> GatewayError {
    GatewayError::Remote {
        status: 404,
        message: what,
    }
}

/// Backend-side ledger arithmetic: derive paid/pending/credit and status from
/// the payment list.
pub fn recompute(ledger: &mut CycleLedgerDto) {
    let paid: Decimal = ledger.payments.iter().map(|p| p.amount).sum();
    let outstanding = ledger.total_amount - paid;
    ledger.paid_amount = paid;
    ledger.pending_balance = outstanding.max(Decimal::ZERO);
    ledger.credit_balance = (-outstanding).max(Decimal::ZERO);
    ledger.payment_status = if ledger.total_amount == Decimal::ZERO {
        "NONE".to_string()
    } else if outstanding <= Decimal::ZERO {
        "PAID".to_string()
    } else if paid > Decimal::ZERO {
        "PARTIAL".to_string()
    } else {
        "PENDING".to_string()
    };
}

#[async_trait]
impl BillingGateway for MockGateway {
    async fn subscriptions(&self, customer_id: i64) -> Result<Vec<SubscriptionDto>, GatewayError> {
        let (delay, result) = {
            let state = self.state.lock().unwrap();
            let result = match &state.fail_subscriptions {
                Some(message) => Err(remote(message)),
                None => Ok(state
                    .subscriptions
                    .get(&customer_id)
                    .cloned()
                    .unwrap_or_default()),
            };
            (state.subscriptions_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn cycle_ledger(&self, cycle_id: i64) -> Result<CycleLedgerDto, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.ledger_fetches.push(cycle_id);
        if state.failing_cycles.contains(&cycle_id) {
            return Err(remote("ledger unavailable"));
        }
        state
            .ledgers
            .get(&cycle_id)
            .cloned()
            .ok_or_else(|| not_found(format!("cycle {} not found", cycle_id)))
    }

    async fn register_payment(&self, payment: &NewPaymentDto) -> Result<PaymentDto, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_register.clone() {
            return Err(remote(&message));
        }
        state.next_payment_id += 1;
        let created = PaymentDto {
            payment_id: state.next_payment_id,
            amount: payment.amount,
            payment_method: payment.payment_method.clone(),
            payment_date: payment.payment_date,
            reference: payment.reference.clone(),
            notes: payment.notes.clone(),
            created_by: Some("test-operator".to_string()),
        };
        let ledger = state
            .ledgers
            .get_mut(&payment.cycle_id)
            .ok_or_else(|| not_found(format!("cycle {} not found", payment.cycle_id)))?;
        ledger.payments.push(created.clone());
        recompute(ledger);
        state.registered.push(payment.clone());
        Ok(created)
    }

    async fn update_payment(
        &self,
        payment_id: i64,
        patch: &PaymentPatchDto,
    ) -> Result<PaymentDto, GatewayError> {
        let mut state = self.state.lock().unwrap();
        let mut updated = None;
        for ledger in state.ledgers.values_mut() {
            if let Some(existing) = ledger.payments.iter_mut().find(|p| p.payment_id == payment_id)
            {
                existing.amount = patch.amount;
                existing.payment_method = patch.payment_method.clone();
                existing.payment_date = patch.payment_date;
                existing.reference = patch.reference.clone();
                existing.notes = patch.notes.clone();
                updated = Some(existing.clone());
                recompute(ledger);
                break;
            }
        }
        let updated =
            updated.ok_or_else(|| not_found(format!("payment {} not found", payment_id)))?;
        state.updated.push((payment_id, patch.clone()));
        Ok(updated)
    }

    async fn delete_payment(
        &self,
        payment_id: i64,
        audit: Option<&MutationAudit>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        let mut found = false;
        for ledger in state.ledgers.values_mut() {
            let before = ledger.payments.len();
            ledger.payments.retain(|p| p.payment_id != payment_id);
            if ledger.payments.len() != before {
                recompute(ledger);
                found = true;
                break;
            }
        }
        if !found {
            return Err(not_found(format!("payment {} not found", payment_id)));
        }
        state.deleted.push((payment_id, audit.is_some()));
        Ok(())
    }

    async fn pending_cycles(&self, customer_id: i64) -> Result<PendingCyclesDto, GatewayError> {
        let state = self.state.lock().unwrap();
        state
            .pending
            .get(&customer_id)
            .cloned()
            .ok_or_else(|| not_found(format!("customer {} not found", customer_id)))
    }

    async fn generate_collection_order(
        &self,
        request: &CollectionOrderRequestDto,
    ) -> Result<CollectionOrderReceiptDto, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_generate.clone() {
            return Err(remote(&message));
        }
        let total: Decimal = state
            .pending
            .get(&request.customer_id)
            .map(|dto| {
                dto.pending_cycles
                    .iter()
                    .filter(|c| request.selected_cycles.contains(&c.cycle_id))
                    .map(|c| c.pending_balance)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO);
        state.next_order_id += 1;
        let receipt = CollectionOrderReceiptDto {
            order_id: state.next_order_id,
            total_amount: total,
            cycles_processed: request.selected_cycles.len() as u32,
            message: format!("Orden de cobro #{} generada", state.next_order_id),
        };
        state.generated.push(request.clone());
        Ok(receipt)
    }
}

#[async_trait]
impl RoleGateway for MockGateway {
    async fn role_modules(&self, role: &str) -> Result<Vec<String>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.role_queries.push(role.to_string());
        if state.fail_roles {
            return Err(remote("auth service unavailable"));
        }
        Ok(state.modules.get(role).cloned().unwrap_or_default())
    }
}

// ============================================================================
// Fixture builders
// ============================================================================

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

pub fn cycle_ref(cycle_id: i64, cycle_number: u32, due: &str) -> CycleRefDto {
    CycleRefDto {
        cycle_id,
        cycle_number,
        period_start: date("2026-02-01"),
        period_end: date("2026-02-28"),
        payment_due_date: date(due),
    }
}

pub fn subscription(
    subscription_id: i64,
    customer_id: i64,
    plan_name: &str,
    cycles: Vec<CycleRefDto>,
) -> SubscriptionDto {
    SubscriptionDto {
        subscription_id,
        customer_id,
        plan_name: plan_name.to_string(),
        start_date: date("2026-01-01"),
        collection_day: 5,
        payment_mode: "ADVANCE".to_string(),
        cycles,
    }
}

pub fn payment(payment_id: i64, amount: i64, method: &str) -> PaymentDto {
    PaymentDto {
        payment_id,
        amount: dec(amount),
        payment_method: method.to_string(),
        payment_date: ts("2026-03-01T12:00:00Z"),
        reference: None,
        notes: None,
        created_by: Some("test-operator".to_string()),
    }
}

/// Build a ledger from a total and a payment list; derived fields come from
/// the same arithmetic the mock backend applies.
pub fn ledger(cycle_id: i64, total: i64, payments: Vec<PaymentDto>, due: &str) -> CycleLedgerDto {
    let mut dto = CycleLedgerDto {
        cycle_id,
        total_amount: dec(total),
        paid_amount: Decimal::ZERO,
        pending_balance: Decimal::ZERO,
        credit_balance: Decimal::ZERO,
        payment_status: "PENDING".to_string(),
        payment_due_date: date(due),
        payments,
    };
    recompute(&mut dto);
    dto
}

pub fn pending_cycle(cycle_id: i64, plan: &str, number: u32, balance: i64) -> PendingCycleDto {
    PendingCycleDto {
        cycle_id,
        plan_name: plan.to_string(),
        cycle_number: number,
        payment_due_date: date("2026-03-01"),
        pending_balance: dec(balance),
        days_overdue: Some(10),
    }
}

pub fn pending_set(customer_id: i64, name: &str, cycles: Vec<PendingCycleDto>) -> PendingCyclesDto {
    let total = cycles.iter().map(|c| c.pending_balance).sum();
    PendingCyclesDto {
        customer_info: CustomerInfoDto {
            customer_id,
            full_name: name.to_string(),
        },
        pending_cycles: cycles,
        total_pending: total,
    }
}

/// Grant the collections module to the privileged roles.
pub fn grant_collections_modules(state: &mut MockState) {
    for role in ["administrador", "supervisor"] {
        state.modules.insert(
            role.to_string(),
            vec!["cobranzas".to_string(), "clientes".to_string()],
        );
    }
}
