//! Shipping handlers: rate quotes, tracking and manual shipment creation.

use axum::extract::{Path, State};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    CreateShipmentResponse, RateQuoteResponse, TrackShipmentRequest, TrackShipmentResponse,
};
use crate::app_state::AppState;
use crate::domain::OrderId;
use crate::error::{ErrorResponse, GatewayError};
use crate::providers::shiprocket::RateQuoteRequest;

/// `POST /shipping/rates`: Quote couriers for a route.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for missing or non-positive
/// fields and [`GatewayError::DownstreamProvider`] on provider failures.
#[utoipa::path(
    post,
    path = "/api/v1/shipping/rates",
    tag = "Shipping",
    summary = "Quote shipping rates",
    description = "Lists couriers able to serve the route. Falls back to a standard delivery option when the provider lists none.",
    request_body = RateQuoteRequest,
    responses(
        (status = 200, description = "Courier options", body = RateQuoteResponse),
        (status = 400, description = "Invalid parcel or route", body = ErrorResponse),
        (status = 502, description = "Shipping provider unavailable", body = ErrorResponse),
    )
)]
pub async fn quote_rates(
    State(state): State<AppState>,
    payload: Result<Json<RateQuoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let couriers = state.shipping.quote_rates(&request).await?;
    Ok(Json(RateQuoteResponse {
        success: true,
        couriers,
    }))
}

/// `POST /shipments/track`: Look up tracking for an AWB.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a blank tracking number or
/// malformed order id, and [`GatewayError::DownstreamProvider`] on
/// provider failures.
#[utoipa::path(
    post,
    path = "/api/v1/shipments/track",
    tag = "Shipping",
    summary = "Track a shipment",
    description = "Returns the provider tracking snapshot. When `order_id` is supplied the order's shipment status is refreshed.",
    request_body = TrackShipmentRequest,
    responses(
        (status = 200, description = "Tracking snapshot", body = TrackShipmentResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Shipping provider unavailable", body = ErrorResponse),
    )
)]
pub async fn track_shipment(
    State(state): State<AppState>,
    payload: Result<Json<TrackShipmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let order_id = request
        .order_id
        .as_deref()
        .map(OrderId::parse_canonical)
        .transpose()?;
    let tracking = state
        .shipping
        .track(&request.tracking_number, order_id)
        .await?;
    Ok(Json(TrackShipmentResponse {
        success: true,
        tracking,
    }))
}

/// `POST /orders/{id}/shipment`: Create the shipment for a paid order.
///
/// Used to remediate orders whose automatic shipment creation failed.
///
/// # Errors
///
/// Returns [`GatewayError::OrderNotFound`] if the order does not exist,
/// [`GatewayError::InvalidRequest`] if it cannot be shipped, and
/// [`GatewayError::DownstreamProvider`] on provider failures.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/shipment",
    tag = "Shipping",
    summary = "Create a shipment manually",
    description = "Submits the shipment for a paid order that has none recorded yet.",
    params(
        ("id" = uuid::Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 201, description = "Shipment created", body = CreateShipmentResponse),
        (status = 400, description = "Order cannot be shipped", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 502, description = "Shipping provider unavailable", body = ErrorResponse),
    )
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let order_id = OrderId::parse_canonical(&id)?;
    let shipment = state.shipping.create_manual(order_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateShipmentResponse {
            success: true,
            order_id,
            shipment,
        }),
    ))
}

/// Shipping routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shipping/rates", post(quote_rates))
        .route("/shipments/track", post(track_shipment))
        .route("/orders/{id}/shipment", post(create_shipment))
}
