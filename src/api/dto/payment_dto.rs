//! Payment DTOs for verification and provider order creation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::required;
use crate::domain::OrderId;
use crate::error::GatewayError;
use crate::providers::razorpay::{CreateOrderRequest, ProviderOrder};
use crate::service::{PaymentOrder, PaymentVerification};

/// Request body for `POST /api/v1/payments/verify`, as posted by the
/// checkout widget callback.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    /// Provider payment id (`pay_…`).
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    /// Provider order id (`order_…`).
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    /// Hex HMAC-SHA256 of `order_id|payment_id`.
    #[serde(default)]
    pub razorpay_signature: Option<String>,
    /// Application order UUID.
    #[serde(default)]
    pub order_id: Option<String>,
}

impl TryFrom<VerifyPaymentRequest> for PaymentVerification {
    type Error = GatewayError;

    fn try_from(body: VerifyPaymentRequest) -> Result<Self, Self::Error> {
        let (Some(payment_id), Some(provider_order_id), Some(signature), Some(order_id)) = (
            required(body.razorpay_payment_id),
            required(body.razorpay_order_id),
            required(body.razorpay_signature),
            required(body.order_id),
        ) else {
            return Err(GatewayError::MalformedPayload(
                "missing required payment verification fields".to_string(),
            ));
        };
        Ok(Self {
            order_id: OrderId::parse_canonical(&order_id)?,
            provider_order_id,
            provider_payment_id: payment_id,
            signature,
        })
    }
}

/// Response body for a successful verification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome description.
    pub message: String,
    /// Settled order.
    pub order_id: OrderId,
}

/// Request body for `POST /api/v1/payments/orders`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreatePaymentOrderRequest {
    /// Amount in smallest currency units (paise for INR).
    #[serde(default)]
    pub amount: Option<i64>,
    /// ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Merchant receipt, conventionally `order_<uuid>`.
    #[serde(default)]
    pub receipt: Option<String>,
    /// Notes echoed back in webhooks; put `orderId` here.
    #[serde(default)]
    pub notes: Option<serde_json::Value>,
}

impl TryFrom<CreatePaymentOrderRequest> for CreateOrderRequest {
    type Error = GatewayError;

    fn try_from(body: CreatePaymentOrderRequest) -> Result<Self, Self::Error> {
        let (Some(amount), Some(currency), Some(receipt)) = (
            body.amount,
            required(body.currency),
            required(body.receipt),
        ) else {
            return Err(GatewayError::InvalidRequest(
                "amount, currency and receipt are required".to_string(),
            ));
        };
        Ok(Self {
            amount,
            currency,
            receipt,
            notes: body
                .notes
                .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
        })
    }
}

/// Response body for `POST /api/v1/payments/orders`: the provider order
/// plus what the checkout widget needs.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentOrderResponse {
    /// Provider order fields.
    #[serde(flatten)]
    pub order: ProviderOrder,
    /// Provider order id, duplicated for the widget.
    #[serde(rename = "razorpayOrderId")]
    pub razorpay_order_id: String,
    /// Public key id.
    pub key: Option<String>,
}

impl From<PaymentOrder> for PaymentOrderResponse {
    fn from(created: PaymentOrder) -> Self {
        Self {
            razorpay_order_id: created.order.id.clone(),
            order: created.order,
            key: created.key_id,
        }
    }
}
