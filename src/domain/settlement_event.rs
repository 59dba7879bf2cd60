//! Domain events emitted by the settlement pipeline.
//!
//! Every committed transition, ignored webhook and side-effect run
//! publishes a [`SettlementEvent`] through the [`super::EventBus`]. The
//! server's audit task logs each one.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{OrderId, OrderStatus};

/// Entry point that drove a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementSource {
    /// Provider-initiated webhook.
    Webhook,
    /// Client-initiated checkout verification.
    Verification,
}

/// Result of the shipment side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShipmentOutcome {
    /// Shipment accepted by the provider and recorded on the order.
    Created {
        /// Provider shipment id.
        shipment_id: String,
    },
    /// Order lacks an address or courier selection, or already shipped.
    Skipped,
    /// Provider or persistence failure; needs remediation.
    Failed {
        /// Failure description.
        reason: String,
    },
}

/// Domain event emitted by the pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SettlementEvent {
    /// A conditional status update was committed.
    OrderTransitioned {
        /// Order identifier.
        order_id: OrderId,
        /// Status before the update.
        from: OrderStatus,
        /// Status after the update.
        to: OrderStatus,
        /// Provider payment id written with the update.
        payment_id: Option<String>,
        /// Entry point.
        source: SettlementSource,
        /// Commit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A webhook was acknowledged without changing any order.
    WebhookIgnored {
        /// Provider event type.
        provider_event: String,
        /// Why nothing changed.
        reason: String,
        /// Acknowledgement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Post-settlement side effects finished.
    EffectsCompleted {
        /// Order identifier.
        order_id: OrderId,
        /// Products whose stock was decremented.
        inventory_updated: usize,
        /// Items that failed or were skipped as invalid.
        inventory_failed: usize,
        /// Shipment result.
        shipment: ShipmentOutcome,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SettlementEvent {
    /// Returns the order this event concerns, if any.
    #[must_use]
    pub const fn order_id(&self) -> Option<OrderId> {
        match self {
            Self::OrderTransitioned { order_id, .. } | Self::EffectsCompleted { order_id, .. } => {
                Some(*order_id)
            }
            Self::WebhookIgnored { .. } => None,
        }
    }

    /// Returns the event type discriminator string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::OrderTransitioned { .. } => "order_transitioned",
            Self::WebhookIgnored { .. } => "webhook_ignored",
            Self::EffectsCompleted { .. } => "effects_completed",
        }
    }
}
