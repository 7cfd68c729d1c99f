//! Payment transaction state machine for one cycle-detail session.
//!
//! `Idle → Composing → PendingConfirm → Committing → Idle` on success, back
//! to `Composing` (form retained) on failure. The tagged state makes the
//! illegal combinations of the old boolean flags unrepresentable: one form at
//! a time, one in-flight mutation at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use console_core::gateway::types::{MutationAudit, NewPaymentDto, PaymentPatchDto};
use console_core::gateway::{BillingGateway, RoleGateway};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{ConsoleError, Notice};
use crate::models::{resolve_payment_id, CycleLedger, Payment, PaymentMethod, PaymentStatus};
use crate::services::events::{ChangeBus, PaymentChanged};
use crate::services::ledger_cache::CycleLedgerCache;
use crate::services::roles::{Capabilities, OperatorRole};

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentForm {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

impl PaymentForm {
    /// Fresh register form: amount defaults to the cycle's current pending
    /// balance as last reported by the ledger.
    fn for_register(ledger: &CycleLedger) -> Self {
        Self {
            amount: ledger.pending_balance,
            method: PaymentMethod::Cash,
            paid_at: Utc::now(),
            reference: None,
            notes: None,
        }
    }

    fn for_amend(payment: &Payment) -> Self {
        Self {
            amount: payment.amount,
            method: payment.method,
            paid_at: payment.paid_at,
            reference: payment.reference.clone(),
            notes: payment.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    Register,
    Amend { payment_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Register(PaymentForm),
    Amend { payment_id: i64, form: PaymentForm },
    Void { payment_id: i64 },
}

/// Human-readable content of the second-confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmSummary {
    pub prompt: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Composing {
        mode: ComposeMode,
        form: PaymentForm,
    },
    PendingConfirm {
        mutation: Mutation,
        summary: ConfirmSummary,
    },
    Committing {
        mutation: Mutation,
    },
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Composing { .. } => "composing",
            Self::PendingConfirm { .. } => "pending confirmation",
            Self::Committing { .. } => "committing",
        }
    }
}

pub struct PaymentSession {
    gateway: Arc<dyn BillingGateway>,
    cache: Arc<CycleLedgerCache>,
    bus: ChangeBus,
    customer_id: i64,
    cycle_id: i64,
    capabilities: Capabilities,
    ledger: Arc<CycleLedger>,
    state: SessionState,
    notice: Option<Notice>,
    void_audit: Option<MutationAudit>,
}

impl PaymentSession {
    /// Open the cycle detail: pull the ledger through the cache and resolve
    /// role capabilities once for the whole session.
    pub async fn open(
        gateway: Arc<dyn BillingGateway>,
        cache: Arc<CycleLedgerCache>,
        bus: ChangeBus,
        role_gate: &dyn RoleGateway,
        role: OperatorRole,
        customer_id: i64,
        cycle_id: i64,
    ) -> Result<Self, ConsoleError> {
        let ledger = cache.refresh(cycle_id).await?;
        let capabilities = Capabilities::resolve(role_gate, role).await;
        Ok(Self {
            gateway,
            cache,
            bus,
            customer_id,
            cycle_id,
            capabilities,
            ledger,
            state: SessionState::Idle,
            notice: None,
            void_audit: None,
        })
    }

    pub fn ledger(&self) -> &CycleLedger {
        &self.ledger
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Attach an audit reason to the next void. The gateway accepts the call
    /// with or without it.
    pub fn set_void_reason(&mut self, reason: Option<String>) {
        self.void_audit = reason.map(|reason| MutationAudit {
            reason: Some(reason),
        });
    }

    /// Registering is offered only while idle and only while the ledger says
    /// the cycle is not fully paid. Re-evaluated against every fresh snapshot.
    pub fn can_register(&self) -> bool {
        matches!(self.state, SessionState::Idle) && self.ledger.status != PaymentStatus::Paid
    }

    pub fn can_amend(&self) -> bool {
        self.capabilities.amend_payments
    }

    pub fn can_void(&self) -> bool {
        self.capabilities.void_payments
    }

    /// The form being composed, if any.
    pub fn form(&self) -> Option<&PaymentForm> {
        match &self.state {
            SessionState::Composing { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut PaymentForm> {
        match &mut self.state {
            SessionState::Composing { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn begin_register(&mut self) -> Result<(), ConsoleError> {
        self.require_idle("open the payment form")?;
        if self.ledger.status == PaymentStatus::Paid {
            return Err(self.reject(ConsoleError::Validation(
                "cycle is already fully paid".to_string(),
            )));
        }
        self.state = SessionState::Composing {
            mode: ComposeMode::Register,
            form: PaymentForm::for_register(&self.ledger),
        };
        Ok(())
    }

    /// Load an existing payment into the edit form. While editing, the
    /// register form is structurally unavailable.
    pub fn begin_amend(&mut self, selection: &Value) -> Result<(), ConsoleError> {
        self.require_idle("open the edit form")?;
        if !self.capabilities.amend_payments {
            return Err(self.reject(ConsoleError::Forbidden("amend payments")));
        }
        let payment_id = self.resolve_selection(selection)?;
        let payment = self.payment_in_ledger(payment_id)?;
        self.state = SessionState::Composing {
            mode: ComposeMode::Amend { payment_id },
            form: PaymentForm::for_amend(&payment),
        };
        Ok(())
    }

    /// Open the delete confirmation for an existing payment.
    pub fn request_void(&mut self, selection: &Value) -> Result<(), ConsoleError> {
        self.require_idle("request a deletion")?;
        if !self.capabilities.void_payments {
            return Err(self.reject(ConsoleError::Forbidden("void payments")));
        }
        let payment_id = self.resolve_selection(selection)?;
        self.payment_in_ledger(payment_id)?;
        let mutation = Mutation::Void { payment_id };
        let summary = confirm_summary(&mutation);
        self.state = SessionState::PendingConfirm { mutation, summary };
        Ok(())
    }

    /// Move a composed form to the confirmation dialog.
    pub fn confirm_submission(&mut self) -> Result<(), ConsoleError> {
        let (mode, form) = match &self.state {
            SessionState::Composing { mode, form } => (*mode, form.clone()),
            _ => return Err(self.state_error("ask for confirmation")),
        };
        if form.amount <= Decimal::ZERO {
            return Err(self.reject(ConsoleError::Validation(
                "payment amount must be greater than zero".to_string(),
            )));
        }
        let mutation = match mode {
            ComposeMode::Register => Mutation::Register(form),
            ComposeMode::Amend { payment_id } => Mutation::Amend { payment_id, form },
        };
        let summary = confirm_summary(&mutation);
        self.state = SessionState::PendingConfirm { mutation, summary };
        Ok(())
    }

    /// The dialog is a single-use gate: dismissing it returns to the form
    /// (void has no form and falls back to idle).
    pub fn dismiss_confirm(&mut self) -> Result<(), ConsoleError> {
        let mutation = match &self.state {
            SessionState::PendingConfirm { mutation, .. } => mutation.clone(),
            _ => return Err(self.state_error("dismiss the confirmation")),
        };
        self.state = match mutation {
            Mutation::Register(form) => SessionState::Composing {
                mode: ComposeMode::Register,
                form,
            },
            Mutation::Amend { payment_id, form } => SessionState::Composing {
                mode: ComposeMode::Amend { payment_id },
                form,
            },
            Mutation::Void { .. } => SessionState::Idle,
        };
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ConsoleError> {
        match self.state {
            SessionState::Composing { .. } | SessionState::PendingConfirm { .. } => {
                self.state = SessionState::Idle;
                Ok(())
            }
            _ => Err(self.state_error("cancel")),
        }
    }

    /// Commit the confirmed mutation: exactly one remote call, then the
    /// ledger re-fetch sequenced strictly after its success. All follow-up
    /// defaults come from the refreshed snapshot, never local arithmetic.
    pub async fn commit(&mut self) -> Result<(), ConsoleError> {
        let mutation = match &self.state {
            SessionState::PendingConfirm { mutation, .. } => mutation.clone(),
            _ => return Err(self.state_error("commit")),
        };
        self.state = SessionState::Committing {
            mutation: mutation.clone(),
        };

        if let Err(e) = self.perform(&mutation).await {
            // Confirmation is gone either way; the form survives for retry.
            self.state = match mutation {
                Mutation::Register(form) => SessionState::Composing {
                    mode: ComposeMode::Register,
                    form,
                },
                Mutation::Amend { payment_id, form } => SessionState::Composing {
                    mode: ComposeMode::Amend { payment_id },
                    form,
                },
                Mutation::Void { .. } => SessionState::Idle,
            };
            return Err(self.reject(e));
        }

        let refreshed = self.cache.refresh(self.cycle_id).await;
        self.bus.publish(PaymentChanged {
            customer_id: Some(self.customer_id),
            cycle_id: Some(self.cycle_id),
        });

        let ledger = match refreshed {
            Ok(ledger) => ledger,
            Err(e) => {
                // The mutation landed but the re-fetch failed; without a
                // fresh snapshot no further defaults can be trusted.
                self.state = SessionState::Idle;
                return Err(self.reject(ConsoleError::Gateway(e)));
            }
        };
        self.ledger = ledger;

        self.state = match &mutation {
            Mutation::Register(_) if self.ledger.status != PaymentStatus::Paid => {
                SessionState::Composing {
                    mode: ComposeMode::Register,
                    form: PaymentForm::for_register(&self.ledger),
                }
            }
            _ => SessionState::Idle,
        };
        self.notice = Some(Notice::Success(success_text(&mutation)));
        Ok(())
    }

    /// Re-pull the ledger snapshot. A cycle that became fully paid closes any
    /// open register form.
    pub async fn refresh(&mut self) -> Result<(), ConsoleError> {
        let ledger = match self.cache.refresh(self.cycle_id).await {
            Ok(ledger) => ledger,
            Err(e) => return Err(self.reject(ConsoleError::Gateway(e))),
        };
        self.ledger = ledger;
        if self.ledger.status == PaymentStatus::Paid
            && matches!(
                self.state,
                SessionState::Composing {
                    mode: ComposeMode::Register,
                    ..
                }
            )
        {
            self.state = SessionState::Idle;
        }
        Ok(())
    }

    async fn perform(&self, mutation: &Mutation) -> Result<(), ConsoleError> {
        match mutation {
            Mutation::Register(form) => {
                let dto = NewPaymentDto {
                    cycle_id: self.cycle_id,
                    amount: form.amount,
                    payment_method: form.method.as_str().to_string(),
                    payment_date: form.paid_at,
                    reference: form.reference.clone(),
                    notes: form.notes.clone(),
                };
                self.gateway.register_payment(&dto).await?;
            }
            Mutation::Amend { payment_id, form } => {
                let patch = PaymentPatchDto {
                    amount: form.amount,
                    payment_method: form.method.as_str().to_string(),
                    payment_date: form.paid_at,
                    reference: form.reference.clone(),
                    notes: form.notes.clone(),
                };
                self.gateway.update_payment(*payment_id, &patch).await?;
            }
            Mutation::Void { payment_id } => {
                self.gateway
                    .delete_payment(*payment_id, self.void_audit.as_ref())
                    .await?;
            }
        }
        Ok(())
    }

    fn payment_in_ledger(&mut self, payment_id: i64) -> Result<Payment, ConsoleError> {
        match self
            .ledger
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id)
        {
            Some(payment) => Ok(payment.clone()),
            None => Err(self.reject(ConsoleError::Validation(format!(
                "payment {} is not part of this cycle",
                payment_id
            )))),
        }
    }

    fn resolve_selection(&mut self, selection: &Value) -> Result<i64, ConsoleError> {
        match resolve_payment_id(selection) {
            Some(payment_id) => Ok(payment_id),
            None => Err(self.reject(ConsoleError::Validation(
                "selection does not carry a usable payment identifier".to_string(),
            ))),
        }
    }

    fn require_idle(&mut self, action: &'static str) -> Result<(), ConsoleError> {
        if matches!(self.state, SessionState::Idle) {
            Ok(())
        } else {
            Err(self.state_error(action))
        }
    }

    fn state_error(&mut self, action: &'static str) -> ConsoleError {
        let state = self.state.name();
        self.reject(ConsoleError::State { action, state })
    }

    /// Every refused or failed operation becomes visible notice state.
    fn reject(&mut self, err: ConsoleError) -> ConsoleError {
        self.notice = Some(Notice::Error(err.to_string()));
        err
    }
}

fn confirm_summary(mutation: &Mutation) -> ConfirmSummary {
    match mutation {
        Mutation::Register(form) => ConfirmSummary {
            prompt: format!("¿Confirmar pago de ${}?", format_amount(&form.amount)),
            detail: form_detail(form),
        },
        Mutation::Amend { payment_id, form } => ConfirmSummary {
            prompt: format!(
                "¿Confirmar la modificación del pago #{} por ${}?",
                payment_id,
                format_amount(&form.amount)
            ),
            detail: form_detail(form),
        },
        Mutation::Void { payment_id } => ConfirmSummary {
            prompt: format!("¿Eliminar el pago #{}?", payment_id),
            detail: "Esta acción no se puede deshacer.".to_string(),
        },
    }
}

fn form_detail(form: &PaymentForm) -> String {
    let mut detail = format!(
        "{} · {}",
        form.method.label(),
        form.paid_at.format("%d/%m/%Y %H:%M")
    );
    if let Some(reference) = &form.reference {
        detail.push_str(" · ref ");
        detail.push_str(reference);
    }
    detail
}

fn success_text(mutation: &Mutation) -> String {
    match mutation {
        Mutation::Register(form) => {
            format!("Pago de ${} registrado", format_amount(&form.amount))
        }
        Mutation::Amend { payment_id, .. } => format!("Pago #{} actualizado", payment_id),
        Mutation::Void { payment_id } => format!("Pago #{} eliminado", payment_id),
    }
}

fn format_amount(amount: &Decimal) -> String {
    amount.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn form(amount: i64) -> PaymentForm {
        PaymentForm {
            amount: Decimal::from(amount),
            method: PaymentMethod::Cash,
            paid_at: chrono::Utc.with_ymd_and_hms(2026, 3, 15, 10, 30, 0).unwrap(),
            reference: None,
            notes: None,
        }
    }

    #[test]
    fn register_prompt_matches_operator_wording() {
        let summary = confirm_summary(&Mutation::Register(form(500)));
        assert_eq!(summary.prompt, "¿Confirmar pago de $500?");
        assert_eq!(summary.detail, "Efectivo · 15/03/2026 10:30");
    }

    #[test]
    fn register_prompt_trims_trailing_zeroes() {
        let mut f = form(0);
        f.amount = Decimal::new(50000, 2); // 500.00
        let summary = confirm_summary(&Mutation::Register(f));
        assert_eq!(summary.prompt, "¿Confirmar pago de $500?");
    }

    #[test]
    fn detail_appends_reference_when_present() {
        let mut f = form(250);
        f.method = PaymentMethod::Transfer;
        f.reference = Some("REC-0042".to_string());
        let summary = confirm_summary(&Mutation::Register(f));
        assert_eq!(summary.detail, "Transferencia · 15/03/2026 10:30 · ref REC-0042");
    }

    #[test]
    fn amend_and_void_prompts_are_distinct() {
        let amend = confirm_summary(&Mutation::Amend {
            payment_id: 7,
            form: form(250),
        });
        assert_eq!(amend.prompt, "¿Confirmar la modificación del pago #7 por $250?");

        let void = confirm_summary(&Mutation::Void { payment_id: 7 });
        assert_eq!(void.prompt, "¿Eliminar el pago #7?");
    }
}
