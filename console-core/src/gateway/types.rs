//! Wire shapes exchanged with the billing gateway.
//!
//! Amounts arrive as JSON numbers or numeric strings depending on the
//! gateway code path; the `amount` serde helper normalizes both to
//! `Decimal` and always serializes back as a numeric string.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Subscriptions and cycles
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDto {
    pub subscription_id: i64,
    pub customer_id: i64,
    pub plan_name: String,
    pub start_date: NaiveDate,
    pub collection_day: u8,
    pub payment_mode: String,
    #[serde(default)]
    pub cycles: Vec<CycleRefDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRefDto {
    pub cycle_id: i64,
    pub cycle_number: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub payment_due_date: NaiveDate,
}

// ============================================================================
// Cycle ledger summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleLedgerDto {
    pub cycle_id: i64,
    #[serde(with = "amount")]
    pub total_amount: Decimal,
    #[serde(with = "amount")]
    pub paid_amount: Decimal,
    #[serde(with = "amount")]
    pub pending_balance: Decimal,
    #[serde(with = "amount")]
    pub credit_balance: Decimal,
    pub payment_status: String,
    pub payment_due_date: NaiveDate,
    #[serde(default)]
    pub payments: Vec<PaymentDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDto {
    pub payment_id: i64,
    #[serde(with = "amount")]
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_date: DateTime<Utc>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

// ============================================================================
// Payment mutations
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentDto {
    pub cycle_id: i64,
    #[serde(with = "amount")]
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPatchDto {
    #[serde(with = "amount")]
    pub amount: Decimal,
    pub payment_method: String,
    pub payment_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Optional audit body for destructive calls. The gateway accepts both an
/// empty body and this shape; neither is assumed authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationAudit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// Manual collection orders
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCyclesDto {
    pub customer_info: CustomerInfoDto,
    #[serde(default)]
    pub pending_cycles: Vec<PendingCycleDto>,
    #[serde(with = "amount")]
    pub total_pending: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfoDto {
    pub customer_id: i64,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCycleDto {
    pub cycle_id: i64,
    pub plan_name: String,
    pub cycle_number: u32,
    pub payment_due_date: NaiveDate,
    #[serde(with = "amount")]
    pub pending_balance: Decimal,
    #[serde(default)]
    pub days_overdue: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOrderRequestDto {
    pub customer_id: i64,
    pub selected_cycles: Vec<i64>,
    pub collection_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionOrderReceiptDto {
    pub order_id: i64,
    #[serde(with = "amount")]
    pub total_amount: Decimal,
    pub cycles_processed: u32,
    pub message: String,
}

// ============================================================================
// Auth role gate
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleModulesDto {
    #[serde(default)]
    pub modules: Vec<String>,
}

// ============================================================================
// Amount normalization
// ============================================================================

pub mod amount {
    use rust_decimal::Decimal;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::str::FromStr;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a numeric or numeric-string amount")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            Decimal::try_from(v).map_err(|_| E::custom(format!("amount out of range: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            Decimal::from_str(v.trim()).map_err(|_| E::custom(format!("invalid amount: {:?}", v)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Wrapper {
        #[serde(with = "amount")]
        value: Decimal,
    }

    #[test]
    fn amount_accepts_json_number() {
        let w: Wrapper = serde_json::from_str(r#"{"value": 1500}"#).unwrap();
        assert_eq!(w.value, Decimal::from(1500));
    }

    #[test]
    fn amount_accepts_decimal_number() {
        let w: Wrapper = serde_json::from_str(r#"{"value": 150.75}"#).unwrap();
        assert_eq!(w.value, Decimal::from_str("150.75").unwrap());
    }

    #[test]
    fn amount_accepts_numeric_string() {
        let w: Wrapper = serde_json::from_str(r#"{"value": "2300.50"}"#).unwrap();
        assert_eq!(w.value, Decimal::from_str("2300.50").unwrap());
    }

    #[test]
    fn amount_rejects_garbage() {
        let result = serde_json::from_str::<Wrapper>(r#"{"value": "not-a-number"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn amount_serializes_as_string() {
        let json = serde_json::to_string(&Wrapper {
            value: Decimal::from_str("99.90").unwrap(),
        })
        .unwrap();
        assert_eq!(json, r#"{"value":"99.90"}"#);
    }

    #[test]
    fn ledger_dto_tolerates_mixed_amount_encodings() {
        let json = r#"{
            "cycle_id": 41,
            "total_amount": "1200.00",
            "paid_amount": 700,
            "pending_balance": "500",
            "credit_balance": 0,
            "payment_status": "PARTIAL",
            "payment_due_date": "2026-03-10",
            "payments": []
        }"#;
        let dto: CycleLedgerDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.pending_balance, Decimal::from(500));
        assert_eq!(dto.paid_amount, Decimal::from(700));
    }
}
