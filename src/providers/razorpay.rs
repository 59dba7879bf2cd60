//! Razorpay REST client.
//!
//! Only two endpoints are used: order creation before checkout and payment
//! lookup during verification. Both authenticate with HTTP basic auth
//! (`key_id:key_secret`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{error_description, http_client};
use crate::config::RazorpayConfig;
use crate::error::GatewayError;

/// Payment status meaning funds were captured.
pub const CAPTURED: &str = "captured";

/// Order creation request forwarded to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Amount in smallest currency units.
    pub amount: i64,
    /// ISO currency code, e.g. `INR`.
    pub currency: String,
    /// Merchant receipt, conventionally `order_<uuid>`.
    pub receipt: String,
    /// Free-form notes echoed back in webhooks.
    #[serde(default)]
    pub notes: serde_json::Value,
}

/// Order as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderOrder {
    /// Provider order id (`order_…`).
    pub id: String,
    /// Entity type, always `order`.
    #[serde(default)]
    pub entity: String,
    /// Amount in smallest currency units.
    pub amount: i64,
    /// Amount already paid.
    #[serde(default)]
    pub amount_paid: i64,
    /// Amount still due.
    #[serde(default)]
    pub amount_due: i64,
    /// Currency code.
    pub currency: String,
    /// Merchant receipt.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Provider order status.
    #[serde(default)]
    pub status: String,
    /// Unix creation time.
    #[serde(default)]
    pub created_at: i64,
}

/// Payment as returned by `GET /v1/payments/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPayment {
    /// Provider payment id (`pay_…`).
    pub id: String,
    /// `created`, `authorized`, `captured`, `refunded` or `failed`.
    pub status: String,
    /// Amount in smallest currency units.
    pub amount: i64,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Provider order the payment belongs to.
    #[serde(default)]
    pub order_id: Option<String>,
}

impl ProviderPayment {
    /// Returns `true` once funds are captured.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.status == CAPTURED
    }
}

/// Payment-provider operations used by the pipeline.
#[async_trait]
pub trait PaymentProvider: std::fmt::Debug + Send + Sync {
    /// Public key id handed to the checkout widget.
    fn key_id(&self) -> Option<&str>;

    /// Creates a provider order ahead of checkout.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] if the provider rejects the order.
    /// - [`GatewayError::DownstreamProvider`] on transport or server errors.
    async fn create_order(&self, request: &CreateOrderRequest)
    -> Result<ProviderOrder, GatewayError>;

    /// Looks up a payment by id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DownstreamProvider`] on any failure.
    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, GatewayError>;
}

/// HTTP implementation of [`PaymentProvider`].
#[derive(Debug, Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayClient {
    /// Creates a client whose calls are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the HTTP client cannot be built.
    pub fn new(config: RazorpayConfig, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client(timeout)?,
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn credentials(&self) -> Result<(&str, &str), GatewayError> {
        match (&self.config.key_id, &self.config.key_secret) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(GatewayError::razorpay("API credentials not configured")),
        }
    }
}

#[async_trait]
impl PaymentProvider for RazorpayClient {
    fn key_id(&self) -> Option<&str> {
        self.config.key_id.as_deref()
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<ProviderOrder, GatewayError> {
        let (key_id, key_secret) = self.credentials()?;
        let response = self
            .http
            .post(self.url("/v1/orders"))
            .basic_auth(key_id, Some(key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::razorpay(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let description = error_description(response).await;
            return Err(GatewayError::InvalidRequest(description));
        }
        if !status.is_success() {
            let description = error_description(response).await;
            return Err(GatewayError::razorpay(format!(
                "order creation failed ({status}): {description}"
            )));
        }

        let order: ProviderOrder = response
            .json()
            .await
            .map_err(|e| GatewayError::razorpay(format!("unexpected order response: {e}")))?;
        tracing::info!(provider_order_id = %order.id, amount = order.amount, "razorpay order created");
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, GatewayError> {
        let (key_id, key_secret) = self.credentials()?;
        let response = self
            .http
            .get(self.url(&format!("/v1/payments/{payment_id}")))
            .basic_auth(key_id, Some(key_secret))
            .send()
            .await
            .map_err(|e| GatewayError::razorpay(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let description = error_description(response).await;
            return Err(GatewayError::razorpay(format!(
                "payment lookup failed ({status}): {description}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::razorpay(format!("unexpected payment response: {e}")))
    }
}
