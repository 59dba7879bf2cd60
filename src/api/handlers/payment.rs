//! Payment handlers: checkout verification and provider order creation.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    CreatePaymentOrderRequest, PaymentOrderResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};
use crate::providers::razorpay::CreateOrderRequest;
use crate::service::PaymentVerification;

/// `POST /payments/verify`: Verify a checkout callback and settle the
/// order.
///
/// # Errors
///
/// Returns [`GatewayError`] on a malformed body, signature or amount
/// mismatch, an order already processed, or infrastructure failures.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    tag = "Payments",
    summary = "Verify a checkout payment",
    description = "Checks the hex HMAC-SHA256 of `razorpay_order_id|razorpay_payment_id`, confirms the payment is captured for exactly the order total, and marks the order paid.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 400, description = "Invalid signature, amount or order state", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 502, description = "Payment provider unavailable", body = ErrorResponse),
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(body) = payload.map_err(|e| GatewayError::MalformedPayload(e.body_text()))?;
    let verification = PaymentVerification::try_from(body)?;
    let outcome = state.settlement.verify_payment(&verification).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: outcome.message().to_string(),
        order_id: verification.order_id,
    }))
}

/// `POST /payments/orders`: Create a provider order for checkout.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for missing fields or a
/// provider rejection, and [`GatewayError::DownstreamProvider`] when the
/// provider is unreachable.
#[utoipa::path(
    post,
    path = "/api/v1/payments/orders",
    tag = "Payments",
    summary = "Create a payment order",
    description = "Creates a Razorpay order for the given amount (in paise) and returns it together with the public key id for the checkout widget.",
    request_body = CreatePaymentOrderRequest,
    responses(
        (status = 201, description = "Provider order created", body = PaymentOrderResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 502, description = "Payment provider unavailable", body = ErrorResponse),
    )
)]
pub async fn create_payment_order(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(body) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let request = CreateOrderRequest::try_from(body)?;
    let created = state.settlement.create_payment_order(&request).await?;

    Ok((StatusCode::CREATED, Json(PaymentOrderResponse::from(created))))
}

/// Payment routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/verify", post(verify_payment))
        .route("/payments/orders", post(create_payment_order))
}
