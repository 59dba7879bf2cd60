//! In-memory order store.
//!
//! Mirrors the conditional-update semantics of the PostgreSQL store: every
//! compare-and-swap runs under the write lock of the order map, so
//! concurrent transitions on the same order have exactly one winner.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{OrderStore, StatusUpdate};
use crate::domain::{Order, OrderId, OrderItem, OrderStatus, ShipmentRecord};
use crate::error::GatewayError;

/// Order store held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
    items: RwLock<HashMap<OrderId, Vec<OrderItem>>>,
    inventory: RwLock<HashMap<uuid::Uuid, i32>>,
}

impl InMemoryOrderStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an order together with its line items.
    pub async fn insert_order(&self, order: Order, items: Vec<OrderItem>) {
        let id = order.id;
        self.orders.write().await.insert(id, order);
        self.items.write().await.insert(id, items);
    }

    /// Sets a product's stock level.
    pub async fn set_inventory(&self, product_id: uuid::Uuid, stock: i32) {
        self.inventory.write().await.insert(product_id, stock);
    }

    /// Returns a product's stock level.
    pub async fn inventory(&self, product_id: uuid::Uuid) -> Option<i32> {
        self.inventory.read().await.get(&product_id).copied()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, GatewayError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn transition(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, GatewayError> {
        let mut orders = self.orders.write().await;
        if update.status == OrderStatus::Paid
            && let Some(payment_id) = update.payment_id.as_deref()
            && orders.values().any(|other| {
                other.id != id
                    && matches!(other.status, OrderStatus::Paid | OrderStatus::Refunded)
                    && other.payment_id.as_deref() == Some(payment_id)
            })
        {
            return Ok(false);
        }
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != update.expected {
            return Ok(false);
        }
        order.status = update.status;
        if let Some(payment_id) = &update.payment_id {
            order.payment_id = Some(payment_id.clone());
        }
        order.updated_at = update.updated_at;
        Ok(true)
    }

    async fn order_with_payment(
        &self,
        payment_id: &str,
        excluding: OrderId,
    ) -> Result<Option<OrderId>, GatewayError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .find(|order| order.id != excluding && order.payment_id.as_deref() == Some(payment_id))
            .map(|order| order.id))
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, GatewayError> {
        Ok(self.items.read().await.get(&id).cloned().unwrap_or_default())
    }

    async fn decrement_inventory(
        &self,
        product_id: uuid::Uuid,
        quantity: i32,
    ) -> Result<Option<i32>, GatewayError> {
        let mut inventory = self.inventory.write().await;
        Ok(inventory.get_mut(&product_id).map(|stock| {
            *stock = stock.saturating_sub(quantity).max(0);
            *stock
        }))
    }

    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentRecord,
    ) -> Result<bool, GatewayError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            Some(order) if !order.shipment.exists() => {
                order.shipment = shipment.clone();
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_shipment_status(
        &self,
        id: OrderId,
        status: &str,
        description: Option<&str>,
    ) -> Result<bool, GatewayError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };
        order.shipment.shipment_status = Some(status.to_string());
        order.shipment.shipment_status_description = description.map(str::to_string);
        order.updated_at = Utc::now();
        Ok(true)
    }
}
