//! Classification of inbound payment-provider webhooks.
//!
//! A webhook envelope is `{ "event": "...", "payload": { ... } }`. The
//! payload shape differs per event family, so the application order id and
//! the provider payment id are found by trying an ordered list of
//! extractors and taking the first non-empty string.

use serde::Deserialize;
use serde_json::Value;

use super::{OrderId, OrderStatus};
use crate::error::GatewayError;

/// Prefix the storefront puts on receipts (`order_<uuid>`).
pub const RECEIPT_PREFIX: &str = "order_";

/// Parsed webhook envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Provider event type, e.g. `payment.captured`.
    pub event: String,
    /// Event payload; kept untyped because entity shapes vary per event.
    #[serde(default)]
    pub payload: Value,
}

/// Provider events the pipeline acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// `order.created`
    OrderCreated,
    /// `payment.authorized`
    PaymentAuthorized,
    /// `payment.captured`
    PaymentCaptured,
    /// `order.paid`
    OrderPaid,
    /// `payment.failed`
    PaymentFailed,
    /// `order.payment_failed`
    OrderPaymentFailed,
    /// `payment.captured.failed`
    PaymentCaptureFailed,
    /// `refund.created`
    RefundCreated,
    /// `refund.processed`
    RefundProcessed,
}

impl PaymentEventKind {
    /// Maps a provider event type; `None` for event types not handled.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        Some(match event_type {
            "order.created" => Self::OrderCreated,
            "payment.authorized" => Self::PaymentAuthorized,
            "payment.captured" => Self::PaymentCaptured,
            "order.paid" => Self::OrderPaid,
            "payment.failed" => Self::PaymentFailed,
            "order.payment_failed" => Self::OrderPaymentFailed,
            "payment.captured.failed" => Self::PaymentCaptureFailed,
            "refund.created" => Self::RefundCreated,
            "refund.processed" => Self::RefundProcessed,
            _ => return None,
        })
    }

    /// Provider event type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order.created",
            Self::PaymentAuthorized => "payment.authorized",
            Self::PaymentCaptured => "payment.captured",
            Self::OrderPaid => "order.paid",
            Self::PaymentFailed => "payment.failed",
            Self::OrderPaymentFailed => "order.payment_failed",
            Self::PaymentCaptureFailed => "payment.captured.failed",
            Self::RefundCreated => "refund.created",
            Self::RefundProcessed => "refund.processed",
        }
    }

    /// Status the order should move to.
    #[must_use]
    pub const fn target_status(self) -> OrderStatus {
        match self {
            Self::OrderCreated | Self::PaymentAuthorized => OrderStatus::Pending,
            Self::PaymentCaptured | Self::OrderPaid => OrderStatus::Paid,
            Self::PaymentFailed | Self::OrderPaymentFailed | Self::PaymentCaptureFailed => {
                OrderStatus::Cancelled
            }
            Self::RefundCreated | Self::RefundProcessed => OrderStatus::Refunded,
        }
    }
}

/// Where an application order id may be found in a payload, in priority
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderIdSource {
    /// `order.entity.notes.orderId`
    OrderNotes,
    /// `payment.entity.notes.orderId`
    PaymentNotes,
    /// `order.entity.receipt` with [`RECEIPT_PREFIX`] stripped
    OrderReceipt,
    /// `payment.entity.order_id`
    PaymentOrderId,
    /// `refund.entity.notes.orderId`
    RefundNotes,
}

/// Extraction order for the application order id.
pub const ORDER_ID_SOURCES: [OrderIdSource; 5] = [
    OrderIdSource::OrderNotes,
    OrderIdSource::PaymentNotes,
    OrderIdSource::OrderReceipt,
    OrderIdSource::PaymentOrderId,
    OrderIdSource::RefundNotes,
];

impl OrderIdSource {
    /// Extracts a trimmed, non-empty candidate from `payload`.
    #[must_use]
    pub fn extract(self, payload: &Value) -> Option<String> {
        let raw = match self {
            Self::OrderNotes => string_at(payload, "/order/entity/notes/orderId"),
            Self::PaymentNotes => string_at(payload, "/payment/entity/notes/orderId"),
            Self::OrderReceipt => string_at(payload, "/order/entity/receipt")
                .map(|r| r.strip_prefix(RECEIPT_PREFIX).unwrap_or(r)),
            Self::PaymentOrderId => string_at(payload, "/payment/entity/order_id"),
            Self::RefundNotes => string_at(payload, "/refund/entity/notes/orderId"),
        };
        non_empty(raw)
    }
}

/// Where a provider payment id may be found in a payload, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentIdSource {
    /// `payment.entity.id`
    PaymentEntity,
    /// `refund.entity.payment_id`
    RefundEntity,
}

/// Extraction order for the provider payment id.
pub const PAYMENT_ID_SOURCES: [PaymentIdSource; 2] =
    [PaymentIdSource::PaymentEntity, PaymentIdSource::RefundEntity];

impl PaymentIdSource {
    /// Extracts a trimmed, non-empty candidate from `payload`.
    #[must_use]
    pub fn extract(self, payload: &Value) -> Option<String> {
        let raw = match self {
            Self::PaymentEntity => string_at(payload, "/payment/entity/id"),
            Self::RefundEntity => string_at(payload, "/refund/entity/payment_id"),
        };
        non_empty(raw)
    }
}

fn string_at<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload.pointer(pointer).and_then(Value::as_str)
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Internal intent derived from a handled webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementIntent {
    /// Event that produced the intent.
    pub kind: PaymentEventKind,
    /// Application order the event refers to.
    pub order_id: OrderId,
    /// Provider payment id.
    pub payment_id: String,
}

impl SettlementIntent {
    /// Status the order should move to.
    #[must_use]
    pub const fn target_status(&self) -> OrderStatus {
        self.kind.target_status()
    }
}

/// Result of classifying a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A handled event with its extracted intent.
    Intent(SettlementIntent),
    /// An event type the pipeline does not act on.
    Unhandled(String),
}

/// Classifies a parsed webhook envelope.
///
/// Unhandled event types are classified before any id extraction so that
/// new provider event types are acknowledged regardless of payload shape.
///
/// # Errors
///
/// - [`GatewayError::MissingOrderId`] if no extractor yields an order id.
/// - [`GatewayError::MalformedPayload`] if the winning order id is not a
///   UUID.
/// - [`GatewayError::MissingPaymentId`] if no extractor yields a payment
///   id.
pub fn classify(envelope: &WebhookEnvelope) -> Result<Classification, GatewayError> {
    let Some(kind) = PaymentEventKind::from_event_type(&envelope.event) else {
        return Ok(Classification::Unhandled(envelope.event.clone()));
    };
    let payload = &envelope.payload;

    let raw_order_id = ORDER_ID_SOURCES
        .iter()
        .find_map(|source| source.extract(payload))
        .ok_or_else(|| GatewayError::MissingOrderId {
            event_type: envelope.event.clone(),
        })?;
    let order_id = raw_order_id.parse::<OrderId>().map_err(|_| {
        GatewayError::MalformedPayload(format!("order id {raw_order_id:?} is not a valid UUID"))
    })?;

    let payment_id = PAYMENT_ID_SOURCES
        .iter()
        .find_map(|source| source.extract(payload))
        .ok_or_else(|| GatewayError::MissingPaymentId {
            event_type: envelope.event.clone(),
        })?;

    Ok(Classification::Intent(SettlementIntent {
        kind,
        order_id,
        payment_id,
    }))
}
