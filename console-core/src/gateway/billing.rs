//! Billing gateway HTTP client.
//!
//! The gateway owns the cycle ledger: every balance and status the console
//! displays comes from one of these calls, never from local arithmetic.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::types::{
    CollectionOrderReceiptDto, CollectionOrderRequestDto, CycleLedgerDto, MutationAudit,
    NewPaymentDto, PaymentDto, PaymentPatchDto, PendingCyclesDto, SubscriptionDto,
};
use crate::error::GatewayError;

/// Remote operations consumed by the console core.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Subscriptions of a customer, with nested cycle references.
    async fn subscriptions(&self, customer_id: i64) -> Result<Vec<SubscriptionDto>, GatewayError>;

    /// Authoritative ledger summary for one cycle.
    async fn cycle_ledger(&self, cycle_id: i64) -> Result<CycleLedgerDto, GatewayError>;

    async fn register_payment(&self, payment: &NewPaymentDto) -> Result<PaymentDto, GatewayError>;

    async fn update_payment(
        &self,
        payment_id: i64,
        patch: &PaymentPatchDto,
    ) -> Result<PaymentDto, GatewayError>;

    /// Delete a payment. The audit body is optional; both call shapes are
    /// accepted by the gateway.
    async fn delete_payment(
        &self,
        payment_id: i64,
        audit: Option<&MutationAudit>,
    ) -> Result<(), GatewayError>;

    /// Outstanding cycles of a customer, for collection-order composition.
    async fn pending_cycles(&self, customer_id: i64) -> Result<PendingCyclesDto, GatewayError>;

    /// Atomically commit a batch of selected cycles as one collection order.
    async fn generate_collection_order(
        &self,
        request: &CollectionOrderRequestDto,
    ) -> Result<CollectionOrderReceiptDto, GatewayError>;
}

/// Configuration for the billing gateway client.
#[derive(Clone, Debug)]
pub struct BillingGatewayConfig {
    pub base_url: String,
}

impl Default for BillingGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081/api".to_string(),
        }
    }
}

/// reqwest-backed gateway client. One `Client` per gateway instance keeps
/// all calls on a single logical connection. No client-side timeouts: a hung
/// call leaves the attended workflow pending rather than guessing.
#[derive(Clone)]
pub struct HttpBillingGateway {
    http: Client,
    base_url: String,
}

impl HttpBillingGateway {
    pub fn new(config: BillingGatewayConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn connect(base_url: &str) -> Self {
        Self::new(BillingGatewayConfig {
            base_url: base_url.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(GatewayError::from)
    }
}

#[async_trait]
impl BillingGateway for HttpBillingGateway {
    async fn subscriptions(&self, customer_id: i64) -> Result<Vec<SubscriptionDto>, GatewayError> {
        let response = self
            .http
            .get(self.url("subscriptions"))
            .query(&[("customer", customer_id)])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn cycle_ledger(&self, cycle_id: i64) -> Result<CycleLedgerDto, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!("cycle-payments/{}", cycle_id)))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn register_payment(&self, payment: &NewPaymentDto) -> Result<PaymentDto, GatewayError> {
        let response = self
            .http
            .post(self.url("cycle-payments"))
            .json(payment)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update_payment(
        &self,
        payment_id: i64,
        patch: &PaymentPatchDto,
    ) -> Result<PaymentDto, GatewayError> {
        let response = self
            .http
            .patch(self.url(&format!("payment/{}", payment_id)))
            .json(patch)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete_payment(
        &self,
        payment_id: i64,
        audit: Option<&MutationAudit>,
    ) -> Result<(), GatewayError> {
        let mut request = self.http.delete(self.url(&format!("payment/{}", payment_id)));
        if let Some(audit) = audit {
            request = request.json(audit);
        }
        let response = request.send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn pending_cycles(&self, customer_id: i64) -> Result<PendingCyclesDto, GatewayError> {
        let response = self
            .http
            .get(self.url(&format!(
                "manual-collection/customers/{}/pending-cycles",
                customer_id
            )))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn generate_collection_order(
        &self,
        request: &CollectionOrderRequestDto,
    ) -> Result<CollectionOrderReceiptDto, GatewayError> {
        let response = self
            .http
            .post(self.url("manual-collection/generate"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[derive(Deserialize)]
struct RemoteErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// Map non-2xx responses to `GatewayError::Remote`, preferring the gateway's
/// structured `{error, details?}` body over raw text.
pub(crate) async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<RemoteErrorBody>(&raw) {
        Ok(body) => match body.details {
            Some(details) => format!("{}: {}", body.error, details),
            None => body.error,
        },
        Err(_) if raw.is_empty() => status.to_string(),
        Err(_) => raw,
    };

    Err(GatewayError::Remote {
        status: status.as_u16(),
        message,
    })
}
