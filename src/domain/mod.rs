//! Domain layer: order model, provider signatures, event classification,
//! the order state machine and the settlement event bus.
//!
//! Everything in here is free of I/O; persistence and provider calls live
//! in [`crate::persistence`] and [`crate::providers`].

pub mod amount;
pub mod event_bus;
pub mod order;
pub mod order_id;
pub mod payment_event;
pub mod settlement_event;
pub mod signature;
pub mod transition;

pub use event_bus::EventBus;
pub use order::{Order, OrderItem, OrderStatus, ShipmentRecord, ShippingAddress, ShippingSelection};
pub use order_id::OrderId;
pub use payment_event::{Classification, PaymentEventKind, SettlementIntent, WebhookEnvelope};
pub use settlement_event::{SettlementEvent, SettlementSource, ShipmentOutcome};
pub use transition::TransitionPlan;
