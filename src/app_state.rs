//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::rate_limit::RateLimiter;
use crate::service::{SettlementService, ShippingService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Webhook, verification and payment order logic.
    pub settlement: Arc<SettlementService>,
    /// Rate quotes, tracking and shipments.
    pub shipping: Arc<ShippingService>,
    /// Per-client limiter for the payment routes.
    pub rate_limiter: Arc<RateLimiter>,
    /// Settlement event bus.
    pub event_bus: EventBus,
}
