//! PostgreSQL implementation of the order store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{OrderItemRow, OrderRow};
use super::{OrderStore, StatusUpdate};
use crate::config::GatewayConfig;
use crate::domain::{Order, OrderId, OrderItem, ShipmentRecord};
use crate::error::GatewayError;

/// PostgreSQL-backed order store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Persistence`] if the database is
    /// unreachable.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations in `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, GatewayError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, status, total, payment_id, shipping_address, shipping_info, \
             shipment_id, tracking_number, awb_number, shipment_status, \
             shipment_status_description, updated_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn transition(&self, id: OrderId, update: &StatusUpdate) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE orders \
             SET status = $3, payment_id = COALESCE($4, payment_id), updated_at = $5 \
             WHERE id = $1 AND status = $2",
        )
        .bind(id.as_uuid())
        .bind(update.expected.as_str())
        .bind(update.status.as_str())
        .bind(update.payment_id.as_deref())
        .bind(update.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            // idx_orders_settled_payment: the payment already settled another order
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn order_with_payment(
        &self,
        payment_id: &str,
        excluding: OrderId,
    ) -> Result<Option<OrderId>, GatewayError> {
        let holder = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM orders WHERE payment_id = $1 AND id <> $2 LIMIT 1",
        )
        .bind(payment_id)
        .bind(excluding.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(holder.map(OrderId::from_uuid))
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, GatewayError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT product_id, quantity FROM order_items WHERE order_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn decrement_inventory(
        &self,
        product_id: uuid::Uuid,
        quantity: i32,
    ) -> Result<Option<i32>, GatewayError> {
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE products \
             SET inventory = GREATEST(COALESCE(inventory, 0) - $2, 0), updated_at = $3 \
             WHERE id = $1 RETURNING inventory",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(remaining)
    }

    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &ShipmentRecord,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE orders \
             SET shipment_id = $2, tracking_number = $3, awb_number = $4, \
                 shipment_status = $5, updated_at = $6 \
             WHERE id = $1 AND shipment_id IS NULL",
        )
        .bind(id.as_uuid())
        .bind(shipment.shipment_id.as_deref())
        .bind(shipment.tracking_number.as_deref())
        .bind(shipment.awb_number.as_deref())
        .bind(shipment.shipment_status.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_shipment_status(
        &self,
        id: OrderId,
        status: &str,
        description: Option<&str>,
    ) -> Result<bool, GatewayError> {
        let result = sqlx::query(
            "UPDATE orders \
             SET shipment_status = $2, shipment_status_description = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status)
        .bind(description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
