//! Service layer: business logic orchestration.
//!
//! [`SettlementService`] drives both settlement paths and emits events
//! through the [`super::domain::EventBus`]. [`SideEffectOrchestrator`] runs
//! inventory and shipment effects for newly paid orders, delegating the
//! shipping half to [`ShippingService`].

pub mod audit;
pub mod effects;
pub mod settlement_service;
pub mod shipping_service;

pub use audit::spawn_audit_logger;
pub use effects::{EffectReport, SideEffectOrchestrator};
pub use settlement_service::{
    PaymentOrder, PaymentVerification, SettlementService, VerificationOutcome, WebhookOutcome,
};
pub use shipping_service::{ShipmentDefaults, ShippingService};
