//! Shipping DTOs for rate quotes, tracking and manual shipment creation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{OrderId, ShipmentRecord};
use crate::providers::shiprocket::{CourierOption, TrackingStatus};

/// Response body for `POST /api/v1/shipping/rates`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RateQuoteResponse {
    /// Always `true`.
    pub success: bool,
    /// Available couriers, cheapest first.
    pub couriers: Vec<CourierOption>,
}

/// Request body for `POST /api/v1/shipments/track`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrackShipmentRequest {
    /// AWB or tracking number.
    pub tracking_number: String,
    /// Order whose shipment status should be refreshed.
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Response body for `POST /api/v1/shipments/track`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrackShipmentResponse {
    /// Always `true`.
    pub success: bool,
    /// Provider tracking snapshot.
    pub tracking: TrackingStatus,
}

/// Response body for `POST /api/v1/orders/{id}/shipment`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateShipmentResponse {
    /// Always `true`.
    pub success: bool,
    /// Order the shipment belongs to.
    pub order_id: OrderId,
    /// Recorded shipment fields.
    pub shipment: ShipmentRecord,
}
