//! Database row models for orders, order items and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{Order, OrderId, OrderItem, OrderStatus, ShipmentRecord};
use crate::error::GatewayError;

/// A row of the `orders` table, restricted to the columns the pipeline
/// reads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    /// Primary key.
    pub id: Uuid,
    /// Status text (`pending`, `paid`, `cancelled`, `refunded`).
    pub status: String,
    /// Order total in major units.
    pub total: Decimal,
    /// Provider payment reference.
    pub payment_id: Option<String>,
    /// Checkout address as JSONB.
    pub shipping_address: Option<Json<serde_json::Value>>,
    /// Checkout courier selection as JSONB.
    pub shipping_info: Option<Json<serde_json::Value>>,
    /// Shiprocket shipment id.
    pub shipment_id: Option<String>,
    /// Tracking number.
    pub tracking_number: Option<String>,
    /// Air waybill number.
    pub awb_number: Option<String>,
    /// Last shipment status.
    pub shipment_status: Option<String>,
    /// Last shipment status description.
    pub shipment_status_description: Option<String>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A row of the `order_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    /// Referenced product.
    pub product_id: Option<Uuid>,
    /// Units ordered.
    pub quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            product_id: row.product_id,
            quantity: row.quantity,
        }
    }
}

/// Decodes an optional JSONB column, treating shapes the storefront wrote
/// incompletely as absent.
fn lenient<T: DeserializeOwned>(
    order_id: Uuid,
    column: &str,
    value: Option<Json<serde_json::Value>>,
) -> Option<T> {
    let Json(value) = value?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!(%order_id, column, error = %e, "ignoring undecodable shipping column");
            None
        }
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = GatewayError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| GatewayError::Persistence(format!("order {}: {e}", row.id)))?;
        Ok(Self {
            id: OrderId::from_uuid(row.id),
            status,
            total: row.total,
            payment_id: row.payment_id,
            shipping_address: lenient(row.id, "shipping_address", row.shipping_address),
            shipping_info: lenient(row.id, "shipping_info", row.shipping_info),
            shipment: ShipmentRecord {
                shipment_id: row.shipment_id,
                tracking_number: row.tracking_number,
                awb_number: row.awb_number,
                shipment_status: row.shipment_status,
                shipment_status_description: row.shipment_status_description,
            },
            updated_at: row.updated_at,
        })
    }
}
