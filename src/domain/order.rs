//! Order aggregate as seen by the settlement pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::OrderId;

/// Payment lifecycle status of an order.
///
/// `pending` is the only non-terminal state. The pipeline never moves an
/// order from a terminal state back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting payment.
    Pending,
    /// Payment captured and verified.
    Paid,
    /// Payment failed or order abandoned.
    Cancelled,
    /// Payment refunded after settlement.
    Refunded,
}

impl OrderStatus {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Returns `true` for `paid`, `cancelled` and `refunded`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    /// Recipient name.
    pub name: String,
    /// Recipient phone.
    pub phone: String,
    /// Street address.
    pub line1: String,
    /// City.
    pub city: String,
    /// State / province.
    pub state: String,
    /// Postal code (PIN code for Indian addresses).
    pub postal_code: String,
    /// Country; the configured default is used when absent.
    #[serde(default)]
    pub country: Option<String>,
}

/// Courier selection made at checkout from a rate quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShippingSelection {
    /// Shiprocket courier company id.
    pub courier_id: i64,
    /// Warehouse PIN code; the configured default is used when absent.
    #[serde(default)]
    pub pickup_pincode: Option<String>,
}

/// Shipment fields written back after the shipping provider accepts a
/// shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
pub struct ShipmentRecord {
    /// Provider shipment id.
    pub shipment_id: Option<String>,
    /// Tracking number shown to the buyer.
    pub tracking_number: Option<String>,
    /// Air waybill number used for tracking lookups.
    pub awb_number: Option<String>,
    /// Last known shipment status (`created`, then provider statuses).
    pub shipment_status: Option<String>,
    /// Human-readable description of `shipment_status`.
    pub shipment_status_description: Option<String>,
}

impl ShipmentRecord {
    /// Returns `true` once a shipment has been created for the order.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.shipment_id.is_some()
    }
}

/// The order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Order identity.
    pub id: OrderId,
    /// Payment lifecycle status.
    pub status: OrderStatus,
    /// Order total in major currency units (e.g. rupees).
    #[schema(value_type = String)]
    pub total: Decimal,
    /// Provider payment reference.
    pub payment_id: Option<String>,
    /// Delivery address, if the buyer provided one.
    pub shipping_address: Option<ShippingAddress>,
    /// Courier selection, if the buyer picked one.
    pub shipping_info: Option<ShippingSelection>,
    /// Shipment tracking fields.
    pub shipment: ShipmentRecord,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a `pending` order with no payment or shipping details.
    #[must_use]
    pub fn pending(id: OrderId, total: Decimal) -> Self {
        Self {
            id,
            status: OrderStatus::Pending,
            total,
            payment_id: None,
            shipping_address: None,
            shipping_info: None,
            shipment: ShipmentRecord::default(),
            updated_at: Utc::now(),
        }
    }

    /// Attaches checkout shipping details.
    #[must_use]
    pub fn with_shipping(mut self, address: ShippingAddress, selection: ShippingSelection) -> Self {
        self.shipping_address = Some(address);
        self.shipping_info = Some(selection);
        self
    }

    /// Returns `true` when the order was already settled with `payment_id`.
    #[must_use]
    pub fn is_settled_with(&self, payment_id: &str) -> bool {
        self.status == OrderStatus::Paid && self.payment_id.as_deref() == Some(payment_id)
    }
}

/// Line item of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product being bought; `None` for items whose product was deleted.
    pub product_id: Option<uuid::Uuid>,
    /// Units ordered.
    pub quantity: i32,
}
