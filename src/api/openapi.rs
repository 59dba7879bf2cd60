//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    AckResponse, CreatePaymentOrderRequest, CreateShipmentResponse, PaymentOrderResponse,
    RateQuoteResponse, TrackShipmentRequest, TrackShipmentResponse, VerifyPaymentRequest,
    VerifyPaymentResponse,
};
use super::handlers::{payment, shipping, system, webhook};
use crate::domain::{OrderId, OrderStatus, ShipmentRecord};
use crate::error::ErrorResponse;
use crate::providers::razorpay::ProviderOrder;
use crate::providers::shiprocket::{CourierOption, RateQuoteRequest, TrackingEvent, TrackingStatus};

/// Generated OpenAPI specification, served as JSON next to Swagger UI.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "settlement-gateway",
        description = "Payment settlement gateway: Razorpay webhooks and checkout verification, idempotent order transitions, inventory and shipment side effects."
    ),
    paths(
        webhook::razorpay_webhook,
        payment::verify_payment,
        payment::create_payment_order,
        shipping::quote_rates,
        shipping::track_shipment,
        shipping::create_shipment,
        system::health_handler,
    ),
    components(schemas(
        AckResponse,
        ErrorResponse,
        VerifyPaymentRequest,
        VerifyPaymentResponse,
        CreatePaymentOrderRequest,
        PaymentOrderResponse,
        ProviderOrder,
        RateQuoteRequest,
        RateQuoteResponse,
        CourierOption,
        TrackShipmentRequest,
        TrackShipmentResponse,
        TrackingStatus,
        TrackingEvent,
        CreateShipmentResponse,
        ShipmentRecord,
        OrderId,
        OrderStatus,
    )),
    tags(
        (name = "Webhooks", description = "Provider-initiated payment events"),
        (name = "Payments", description = "Checkout verification and payment orders"),
        (name = "Shipping", description = "Rates, tracking and shipments"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;
