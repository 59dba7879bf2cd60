//! Payment-provider webhook receiver.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::AckResponse;
use crate::app_state::AppState;
use crate::domain::signature::WEBHOOK_SIGNATURE_HEADER;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /webhooks/razorpay`: Apply a signed payment event.
///
/// The body is taken as raw bytes: the signature covers the exact bytes
/// sent, so it must be verified before any JSON parsing.
///
/// # Errors
///
/// Returns [`GatewayError`] for signature failures, unusable payloads and
/// persistence failures. Every other outcome is acknowledged with 200.
#[utoipa::path(
    post,
    path = "/webhooks/razorpay",
    tag = "Webhooks",
    summary = "Receive a Razorpay webhook",
    description = "Verifies the base64 HMAC-SHA256 signature over the raw body, classifies the event and applies the matching order transition. Duplicate, unknown and out-of-order events are acknowledged without changing state.",
    params(
        ("x-razorpay-signature" = String, Header, description = "Base64 HMAC-SHA256 of the raw body"),
    ),
    request_body(content = serde_json::Value, content_type = "application/json", description = "Provider event envelope `{event, payload}`"),
    responses(
        (status = 200, description = "Event acknowledged", body = AckResponse),
        (status = 400, description = "Invalid signature or payload", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Persistence failure; provider retries", body = ErrorResponse),
    )
)]
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckResponse>, GatewayError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let outcome = state.settlement.handle_webhook(&body, signature).await?;
    Ok(Json(AckResponse::ok(outcome.message())))
}

/// Webhook routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks/razorpay", post(razorpay_webhook))
}
