//! Post-settlement side effects.
//!
//! [`SideEffectOrchestrator`] runs after an order is newly committed as
//! `paid`. Inventory decrement and shipment creation run concurrently on a
//! spawned task; each is bounded by its own timeout and neither can fail
//! the settlement that triggered it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::ShippingService;
use crate::domain::{EventBus, OrderId, SettlementEvent, ShipmentOutcome};
use crate::error::GatewayError;
use crate::persistence::OrderStore;

/// Summary of one side-effect run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectReport {
    /// Settled order.
    pub order_id: OrderId,
    /// Line items whose stock was decremented.
    pub inventory_updated: usize,
    /// Line items that failed or were invalid.
    pub inventory_failed: usize,
    /// Shipment result.
    pub shipment: ShipmentOutcome,
}

#[derive(Debug, Default, Clone, Copy)]
struct InventoryTally {
    updated: usize,
    failed: usize,
}

/// Runs inventory and shipment effects for settled orders.
#[derive(Debug, Clone)]
pub struct SideEffectOrchestrator {
    store: Arc<dyn OrderStore>,
    shipping: Arc<ShippingService>,
    event_bus: EventBus,
    timeout: Duration,
}

impl SideEffectOrchestrator {
    /// Creates a new orchestrator; `timeout` bounds each effect separately.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        shipping: Arc<ShippingService>,
        event_bus: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            shipping,
            event_bus,
            timeout,
        }
    }

    /// Spawns the side effects for `order_id` and returns immediately.
    pub fn schedule(&self, order_id: OrderId) -> JoinHandle<EffectReport> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(order_id).await })
    }

    /// Runs both effects to completion and publishes
    /// [`SettlementEvent::EffectsCompleted`].
    pub async fn run(&self, order_id: OrderId) -> EffectReport {
        let (inventory, shipment) = tokio::join!(
            bounded(self.timeout, self.decrement_inventory(order_id)),
            bounded(self.timeout, self.create_shipment(order_id)),
        );

        let inventory = inventory.unwrap_or_else(|err| {
            tracing::error!(%order_id, error = %err, "inventory update failed");
            InventoryTally::default()
        });
        let shipment = shipment.unwrap_or_else(|err| {
            tracing::error!(%order_id, error = %err, "shipment creation failed");
            ShipmentOutcome::Failed {
                reason: err.to_string(),
            }
        });

        let report = EffectReport {
            order_id,
            inventory_updated: inventory.updated,
            inventory_failed: inventory.failed,
            shipment,
        };
        let _ = self.event_bus.publish(SettlementEvent::EffectsCompleted {
            order_id,
            inventory_updated: report.inventory_updated,
            inventory_failed: report.inventory_failed,
            shipment: report.shipment.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(
            %order_id,
            inventory_updated = report.inventory_updated,
            inventory_failed = report.inventory_failed,
            "side effects completed"
        );
        report
    }

    async fn decrement_inventory(&self, order_id: OrderId) -> Result<InventoryTally, GatewayError> {
        let items = self.store.order_items(order_id).await?;
        let mut tally = InventoryTally::default();
        for item in items {
            let Some(product_id) = item.product_id.filter(|_| item.quantity > 0) else {
                tracing::warn!(%order_id, ?item, "skipping invalid line item");
                tally.failed += 1;
                continue;
            };
            match self
                .store
                .decrement_inventory(product_id, item.quantity)
                .await
            {
                Ok(Some(remaining)) => {
                    tracing::debug!(%order_id, %product_id, remaining, "inventory decremented");
                    tally.updated += 1;
                }
                Ok(None) => {
                    tracing::warn!(%order_id, %product_id, "product not found; stock unchanged");
                    tally.failed += 1;
                }
                Err(err) => {
                    tracing::error!(%order_id, %product_id, error = %err, "inventory decrement failed");
                    tally.failed += 1;
                }
            }
        }
        Ok(tally)
    }

    async fn create_shipment(&self, order_id: OrderId) -> Result<ShipmentOutcome, GatewayError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(GatewayError::OrderNotFound(order_id))?;
        self.shipping.create_for_order(&order).await
    }
}

/// Applies `limit` to an effect, turning expiry into an error.
async fn bounded<T>(
    limit: Duration,
    effect: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    tokio::time::timeout(limit, effect)
        .await
        .map_err(|_| GatewayError::Internal(format!("timed out after {} ms", limit.as_millis())))?
}
