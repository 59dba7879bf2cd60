//! Shipping service: rate quotes, shipment creation and tracking.

use std::sync::Arc;

use crate::config::{PackageDefaults, ShiprocketConfig};
use crate::domain::{Order, OrderId, OrderStatus, ShipmentOutcome, ShipmentRecord};
use crate::error::GatewayError;
use crate::persistence::OrderStore;
use crate::providers::shiprocket::{
    self, CourierOption, RateQuoteRequest, ShipmentRequest, TrackingStatus,
};
use crate::providers::ShippingProvider;

/// Status written when the provider accepts a shipment.
pub const SHIPMENT_CREATED: &str = "created";

/// Defaults applied when an order lacks shipping details.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentDefaults {
    /// Warehouse PIN code.
    pub pickup_pincode: String,
    /// Destination country.
    pub country: String,
    /// Parcel weight and dimensions.
    pub package: PackageDefaults,
}

impl From<&ShiprocketConfig> for ShipmentDefaults {
    fn from(config: &ShiprocketConfig) -> Self {
        Self {
            pickup_pincode: config.default_pickup_pincode.clone(),
            country: config.default_country.clone(),
            package: config.package,
        }
    }
}

/// Coordinates the shipping provider with order persistence.
#[derive(Debug, Clone)]
pub struct ShippingService {
    store: Arc<dyn OrderStore>,
    provider: Arc<dyn ShippingProvider>,
    defaults: ShipmentDefaults,
}

impl ShippingService {
    /// Creates a new `ShippingService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        provider: Arc<dyn ShippingProvider>,
        defaults: ShipmentDefaults,
    ) -> Self {
        Self {
            store,
            provider,
            defaults,
        }
    }

    /// Quotes couriers for a route.
    ///
    /// Returns a single standard option when the provider lists none, so
    /// checkout can always proceed.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for blank PIN codes or
    ///   non-positive dimensions.
    /// - [`GatewayError::DownstreamProvider`] if the provider call fails.
    pub async fn quote_rates(
        &self,
        request: &RateQuoteRequest,
    ) -> Result<Vec<CourierOption>, GatewayError> {
        validate_quote(request)?;
        let couriers = self.provider.quote_rates(request).await?;
        if couriers.is_empty() {
            tracing::info!(
                pickup = %request.pickup_pincode,
                delivery = %request.delivery_pincode,
                "no couriers available; offering standard delivery"
            );
            return Ok(vec![standard_delivery(request)]);
        }
        Ok(couriers)
    }

    /// Creates the shipment for a freshly settled order.
    ///
    /// Orders without an address or courier selection, and orders that
    /// already have a shipment, are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider or the store fails.
    pub async fn create_for_order(&self, order: &Order) -> Result<ShipmentOutcome, GatewayError> {
        if order.shipment.exists() {
            tracing::debug!(order_id = %order.id, "shipment already recorded");
            return Ok(ShipmentOutcome::Skipped);
        }
        let Some(request) = self.shipment_request(order) else {
            tracing::info!(order_id = %order.id, "no shipping details; shipment skipped");
            return Ok(ShipmentOutcome::Skipped);
        };

        let record = self.submit(order.id, &request).await?;
        Ok(ShipmentOutcome::Created {
            shipment_id: record.shipment_id.unwrap_or_default(),
        })
    }

    /// Creates the shipment for a paid order on operator request.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::OrderNotFound`] if the order does not exist.
    /// - [`GatewayError::InvalidRequest`] if the order is not paid, already
    ///   shipped or lacks shipping details.
    /// - [`GatewayError::DownstreamProvider`] if the provider call fails.
    pub async fn create_manual(&self, order_id: OrderId) -> Result<ShipmentRecord, GatewayError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(GatewayError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Paid {
            return Err(GatewayError::InvalidRequest(format!(
                "order must be paid before shipping; current status: {}",
                order.status
            )));
        }
        if order.shipment.exists() {
            return Err(GatewayError::InvalidRequest(
                "shipment already created for this order".to_string(),
            ));
        }
        let request = self.shipment_request(&order).ok_or_else(|| {
            GatewayError::InvalidRequest("order has no shipping address or courier".to_string())
        })?;
        self.submit(order_id, &request).await
    }

    /// Looks up tracking and, when `order_id` is given, stores the latest
    /// status on the order.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for a blank tracking number.
    /// - [`GatewayError::DownstreamProvider`] if the provider call fails.
    pub async fn track(
        &self,
        tracking_number: &str,
        order_id: Option<OrderId>,
    ) -> Result<TrackingStatus, GatewayError> {
        let tracking_number = tracking_number.trim();
        if tracking_number.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "tracking number is required".to_string(),
            ));
        }
        if !shiprocket::is_tracking_number(tracking_number) {
            return Err(GatewayError::InvalidRequest(
                "tracking number may only contain letters, digits, '-' and '_'".to_string(),
            ));
        }
        let tracking = self.provider.track(tracking_number).await?;

        if let Some(order_id) = order_id
            && let Some(status) = tracking
                .current_status
                .as_deref()
                .or(tracking.status.as_deref())
        {
            let description = tracking
                .current_status_description
                .as_deref()
                .or(tracking.status_description.as_deref());
            let updated = self
                .store
                .update_shipment_status(order_id, status, description)
                .await?;
            if !updated {
                tracing::warn!(%order_id, "tracked order not found; status not stored");
            }
        }
        Ok(tracking)
    }

    fn shipment_request(&self, order: &Order) -> Option<ShipmentRequest> {
        let address = order.shipping_address.as_ref()?;
        let selection = order.shipping_info.as_ref()?;
        let package = self.defaults.package;
        Some(ShipmentRequest {
            order_id: order.id.to_string(),
            courier_id: selection.courier_id,
            pickup_pincode: selection
                .pickup_pincode
                .clone()
                .unwrap_or_else(|| self.defaults.pickup_pincode.clone()),
            delivery_pincode: address.postal_code.clone(),
            weight: package.weight_kg,
            length: package.length_cm,
            breadth: package.breadth_cm,
            height: package.height_cm,
            customer_name: address.name.clone(),
            customer_phone: address.phone.clone(),
            customer_address: address.line1.clone(),
            customer_city: address.city.clone(),
            customer_state: address.state.clone(),
            customer_pincode: address.postal_code.clone(),
            customer_country: address
                .country
                .clone()
                .unwrap_or_else(|| self.defaults.country.clone()),
        })
    }

    async fn submit(
        &self,
        order_id: OrderId,
        request: &ShipmentRequest,
    ) -> Result<ShipmentRecord, GatewayError> {
        let created = self.provider.create_shipment(request).await?;
        let record = ShipmentRecord {
            shipment_id: Some(created.shipment_id),
            tracking_number: created.tracking_number,
            awb_number: created.awb_number,
            shipment_status: Some(SHIPMENT_CREATED.to_string()),
            shipment_status_description: None,
        };
        if self.store.record_shipment(order_id, &record).await? {
            tracing::info!(
                %order_id,
                shipment_id = record.shipment_id.as_deref().unwrap_or_default(),
                courier = created.courier_name.as_deref().unwrap_or_default(),
                "shipment created"
            );
        } else {
            tracing::warn!(%order_id, "shipment created but order already had one recorded");
        }
        Ok(record)
    }
}

fn validate_quote(request: &RateQuoteRequest) -> Result<(), GatewayError> {
    if request.pickup_pincode.trim().is_empty() || request.delivery_pincode.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "pickup and delivery pincodes are required".to_string(),
        ));
    }
    let dimensions = [
        request.weight,
        request.length,
        request.breadth,
        request.height,
    ];
    if dimensions.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return Err(GatewayError::InvalidRequest(
            "weight and dimensions must be positive".to_string(),
        ));
    }
    Ok(())
}

fn standard_delivery(request: &RateQuoteRequest) -> CourierOption {
    CourierOption {
        courier_id: 1,
        courier_name: "Standard Delivery".to_string(),
        courier_logo: String::new(),
        rate: 50.0,
        estimated_delivery_days: "5".to_string(),
        estimated_delivery_date: String::new(),
        cod_available: true,
        pickup_pincode: request.pickup_pincode.clone(),
        delivery_pincode: request.delivery_pincode.clone(),
    }
}
