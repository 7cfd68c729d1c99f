//! Domain models for billing-console.

use chrono::{DateTime, NaiveDate, Utc};
use console_core::error::GatewayError;
use console_core::gateway::types::{
    CollectionOrderReceiptDto, CustomerInfoDto, CycleLedgerDto, CycleRefDto, PaymentDto,
    PendingCycleDto, SubscriptionDto,
};
use rust_decimal::Decimal;
use serde_json::Value;

// ============================================================================
// Payment status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    None,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
            Self::Overdue => "OVERDUE",
            Self::None => "NONE",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "PARTIAL" => Self::Partial,
            "PAID" => Self::Paid,
            "OVERDUE" => Self::Overdue,
            _ => Self::None,
        }
    }
}

// ============================================================================
// Payment method
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Transfer,
    DebitCard,
    CreditCard,
    Check,
    MercadoPago,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Transfer => "TRANSFER",
            Self::DebitCard => "DEBIT_CARD",
            Self::CreditCard => "CREDIT_CARD",
            Self::Check => "CHECK",
            Self::MercadoPago => "MERCADO_PAGO",
        }
    }

    /// An unrecognized method is a decode error, not a guess.
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        match s {
            "CASH" => Ok(Self::Cash),
            "TRANSFER" => Ok(Self::Transfer),
            "DEBIT_CARD" => Ok(Self::DebitCard),
            "CREDIT_CARD" => Ok(Self::CreditCard),
            "CHECK" => Ok(Self::Check),
            "MERCADO_PAGO" => Ok(Self::MercadoPago),
            other => Err(GatewayError::Decode(format!(
                "unknown payment method: {}",
                other
            ))),
        }
    }

    /// Operator-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Efectivo",
            Self::Transfer => "Transferencia",
            Self::DebitCard => "Tarjeta de débito",
            Self::CreditCard => "Tarjeta de crédito",
            Self::Check => "Cheque",
            Self::MercadoPago => "Mercado Pago",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    Advance,
    Arrears,
}

impl PaymentMode {
    pub fn parse(s: &str) -> Result<Self, GatewayError> {
        match s {
            "ADVANCE" => Ok(Self::Advance),
            "ARREARS" => Ok(Self::Arrears),
            other => Err(GatewayError::Decode(format!(
                "unknown payment mode: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Subscriptions and cycles
// ============================================================================

#[derive(Debug, Clone)]
pub struct CycleRef {
    pub cycle_id: i64,
    pub cycle_number: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub payment_due_date: NaiveDate,
}

impl From<CycleRefDto> for CycleRef {
    fn from(dto: CycleRefDto) -> Self {
        Self {
            cycle_id: dto.cycle_id,
            cycle_number: dto.cycle_number,
            period_start: dto.period_start,
            period_end: dto.period_end,
            payment_due_date: dto.payment_due_date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub subscription_id: i64,
    pub customer_id: i64,
    pub plan_name: String,
    pub start_date: NaiveDate,
    pub collection_day: u8,
    pub payment_mode: PaymentMode,
    pub cycles: Vec<CycleRef>,
}

impl TryFrom<SubscriptionDto> for Subscription {
    type Error = GatewayError;

    fn try_from(dto: SubscriptionDto) -> Result<Self, Self::Error> {
        Ok(Self {
            subscription_id: dto.subscription_id,
            customer_id: dto.customer_id,
            plan_name: dto.plan_name,
            start_date: dto.start_date,
            collection_day: dto.collection_day,
            payment_mode: PaymentMode::parse(&dto.payment_mode)?,
            cycles: dto.cycles.into_iter().map(CycleRef::from).collect(),
        })
    }
}

// ============================================================================
// Ledger snapshot
// ============================================================================

#[derive(Debug, Clone)]
pub struct Payment {
    pub payment_id: i64,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl TryFrom<PaymentDto> for Payment {
    type Error = GatewayError;

    fn try_from(dto: PaymentDto) -> Result<Self, Self::Error> {
        Ok(Self {
            payment_id: dto.payment_id,
            amount: dto.amount,
            method: PaymentMethod::parse(&dto.payment_method)?,
            paid_at: dto.payment_date,
            reference: dto.reference,
            notes: dto.notes,
            created_by: dto.created_by,
        })
    }
}

/// The last ledger summary fetched for a cycle. Balances and status are
/// whatever the gateway said, never a locally derived figure.
#[derive(Debug, Clone)]
pub struct CycleLedger {
    pub cycle_id: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub pending_balance: Decimal,
    pub credit_balance: Decimal,
    pub status: PaymentStatus,
    pub payment_due_date: Option<NaiveDate>,
    pub payments: Vec<Payment>,
    pub unavailable: bool,
}

impl CycleLedger {
    /// Empty-payments stub rendered when a single cycle's fetch fails.
    pub fn unavailable(cycle_id: i64) -> Self {
        Self {
            cycle_id,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            pending_balance: Decimal::ZERO,
            credit_balance: Decimal::ZERO,
            status: PaymentStatus::None,
            payment_due_date: None,
            payments: Vec::new(),
            unavailable: true,
        }
    }
}

impl TryFrom<CycleLedgerDto> for CycleLedger {
    type Error = GatewayError;

    fn try_from(dto: CycleLedgerDto) -> Result<Self, Self::Error> {
        Ok(Self {
            cycle_id: dto.cycle_id,
            total_amount: dto.total_amount,
            paid_amount: dto.paid_amount,
            pending_balance: dto.pending_balance,
            credit_balance: dto.credit_balance,
            status: PaymentStatus::from_str(&dto.payment_status),
            payment_due_date: Some(dto.payment_due_date),
            payments: dto
                .payments
                .into_iter()
                .map(Payment::try_from)
                .collect::<Result<_, _>>()?,
            unavailable: false,
        })
    }
}

// ============================================================================
// Collection orders
// ============================================================================

#[derive(Debug, Clone)]
pub struct CustomerInfo {
    pub customer_id: i64,
    pub full_name: String,
}

impl From<CustomerInfoDto> for CustomerInfo {
    fn from(dto: CustomerInfoDto) -> Self {
        Self {
            customer_id: dto.customer_id,
            full_name: dto.full_name,
        }
    }
}

/// One outstanding cycle as offered for collection-order selection. Ephemeral,
/// alive only while a composition session is open.
#[derive(Debug, Clone)]
pub struct PendingCycle {
    pub cycle_id: i64,
    pub plan_name: String,
    pub cycle_number: u32,
    pub due_date: NaiveDate,
    pub pending_balance: Decimal,
    pub days_overdue: i64,
}

impl PendingCycle {
    pub fn from_dto(dto: PendingCycleDto, today: NaiveDate) -> Self {
        let days_overdue = dto
            .days_overdue
            .unwrap_or_else(|| (today - dto.payment_due_date).num_days().max(0));
        Self {
            cycle_id: dto.cycle_id,
            plan_name: dto.plan_name,
            cycle_number: dto.cycle_number,
            due_date: dto.payment_due_date,
            pending_balance: dto.pending_balance,
            days_overdue,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionOrderReceipt {
    pub order_id: i64,
    pub total_amount: Decimal,
    pub cycles_processed: u32,
    pub message: String,
}

impl From<CollectionOrderReceiptDto> for CollectionOrderReceipt {
    fn from(dto: CollectionOrderReceiptDto) -> Self {
        Self {
            order_id: dto.order_id,
            total_amount: dto.total_amount,
            cycles_processed: dto.cycles_processed,
            message: dto.message,
        }
    }
}

// ============================================================================
// Payment identifier resolution
// ============================================================================

const PAYMENT_ID_KEYS: [&str; 3] = ["payment_id", "id", "transaction_id"];

/// Normalize a payment selection to a numeric identifier.
///
/// Accepts a raw integer, an integral float, a numeric string, or a row
/// object carrying one of `payment_id` / `id` / `transaction_id` (checked in
/// that order). Returns `None` when nothing parses; the caller surfaces the
/// failure without making a remote call.
pub fn resolve_payment_id(selection: &Value) -> Option<i64> {
    match selection {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Object(map) => PAYMENT_ID_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(resolve_payment_id),
        _ => None,
    }
}
