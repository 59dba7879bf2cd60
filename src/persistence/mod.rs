//! Persistence layer: orders, order items and product inventory.
//!
//! [`OrderStore`] is the seam between the pipeline and the database. Its
//! one concurrency primitive is [`OrderStore::transition`], a conditional
//! update that only writes when the stored status still equals the
//! expected prior status and, for settling writes, no other order already
//! holds the payment. Two implementations exist:
//!
//! - [`postgres::PostgresOrderStore`] backed by `sqlx::PgPool`;
//! - [`memory::InMemoryOrderStore`] with the same compare-and-swap
//!   semantics, used by tests and when persistence is disabled.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Order, OrderId, OrderItem, OrderStatus, ShipmentRecord};
use crate::error::GatewayError;

pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;

/// Conditional status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Status the stored row must still have for the write to apply.
    pub expected: OrderStatus,
    /// Status to write.
    pub status: OrderStatus,
    /// Payment id to write; `None` leaves the column untouched.
    pub payment_id: Option<String>,
    /// New `updated_at`.
    pub updated_at: DateTime<Utc>,
}

/// Storage operations used by the settlement pipeline.
#[async_trait]
pub trait OrderStore: std::fmt::Debug + Send + Sync {
    /// Loads an order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, GatewayError>;

    /// Applies `update` only if the stored status equals `update.expected`.
    ///
    /// A write to `paid` carrying a payment id that another `paid` or
    /// `refunded` order already holds is refused.
    ///
    /// Returns `true` if a row was written, `false` if the order is missing,
    /// its status already moved on, or the payment is taken.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn transition(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, GatewayError>;

    /// Finds an order other than `excluding` that already holds
    /// `payment_id`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn order_with_payment(
        &self,
        payment_id: &str,
        excluding: OrderId,
    ) -> Result<Option<OrderId>, GatewayError>;

    /// Lists the line items of an order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, GatewayError>;

    /// Decrements a product's stock by `quantity`, clamping at zero.
    ///
    /// Returns the new stock level, or `None` if the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn decrement_inventory(
        &self,
        product_id: uuid::Uuid,
        quantity: i32,
    ) -> Result<Option<i32>, GatewayError>;

    /// Records a newly created shipment unless the order already has one.
    ///
    /// Returns `true` if the shipment was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentRecord,
    ) -> Result<bool, GatewayError>;

    /// Refreshes the shipment status columns from a tracking lookup.
    ///
    /// Returns `true` if the order exists.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] on storage failure.
    async fn update_shipment_status(
        &self,
        id: OrderId,
        status: &str,
        description: Option<&str>,
    ) -> Result<bool, GatewayError>;
}
