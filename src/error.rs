//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the settlement pipeline.
//! Each variant maps to a specific HTTP status code and a structured JSON
//! error response. Payment providers treat any non-2xx webhook response as
//! a request to redeliver, so only persistence and provider failures map to
//! 5xx.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{OrderId, OrderStatus};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "success": false,
///   "message": "payment amount does not match order total",
///   "code": 1007,
///   "details": null
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false` for errors.
    pub success: bool,
    /// Human-readable error message.
    pub message: String,
    /// Numeric error code (see code ranges on [`GatewayError`]).
    pub code: u32,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                 |
/// |-----------|-----------------------|-----------------------------|
/// | 1000–1999 | Validation / payment  | 400 Bad Request             |
/// | 2000–2999 | Not Found             | 404 Not Found               |
/// | 3000–3999 | Server / downstream   | 500 / 502                   |
/// | 429       | Rate limiting         | 429 Too Many Requests       |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HMAC signature missing, undecodable, or not matching.
    #[error("invalid signature")]
    SignatureInvalid,

    /// Request body could not be parsed or lacks required fields.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// No order id could be extracted from a webhook payload.
    #[error("could not extract order id from {event_type} event")]
    MissingOrderId {
        /// Provider event type of the offending delivery.
        event_type: String,
    },

    /// No payment id could be extracted from a webhook payload.
    #[error("could not extract payment id from {event_type} event")]
    MissingPaymentId {
        /// Provider event type of the offending delivery.
        event_type: String,
    },

    /// Order with the given ID was not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Order is no longer `pending` and cannot be settled again.
    #[error("order already processed; current status: {0}")]
    OrderAlreadyProcessed(OrderStatus),

    /// Captured amount differs from the stored order total.
    #[error("payment amount does not match order total (expected {expected}, captured {captured})")]
    AmountMismatch {
        /// Order total in smallest currency units.
        expected: i64,
        /// Amount reported by the provider in smallest currency units.
        captured: i64,
    },

    /// Provider reports the payment in a status other than `captured`.
    #[error("payment not captured; status: {0}")]
    PaymentNotCaptured(String),

    /// The payment already settled a different order.
    #[error("payment {0} is already applied to another order")]
    PaymentAlreadyUsed(String),

    /// The payment belongs to a different provider order than the one the
    /// checkout callback signed.
    #[error("payment {payment_id} does not belong to provider order {provider_order_id}")]
    PaymentOrderMismatch {
        /// Provider payment id.
        payment_id: String,
        /// Provider order id from the callback.
        provider_order_id: String,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Client exceeded rate limit.
    #[error("rate limit exceeded; retry after {retry_after_ms} ms")]
    RateLimited {
        /// Milliseconds until the client may retry.
        retry_after_ms: u64,
    },

    /// Payment or shipping provider call failed.
    #[error("{provider} error: {message}")]
    DownstreamProvider {
        /// Provider name (`"razorpay"`, `"shiprocket"`).
        provider: &'static str,
        /// Failure description.
        message: String,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a Razorpay call failure.
    #[must_use]
    pub fn razorpay(message: impl Into<String>) -> Self {
        Self::DownstreamProvider {
            provider: "razorpay",
            message: message.into(),
        }
    }

    /// Shorthand for a Shiprocket call failure.
    #[must_use]
    pub fn shiprocket(message: impl Into<String>) -> Self {
        Self::DownstreamProvider {
            provider: "shiprocket",
            message: message.into(),
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1000,
            Self::SignatureInvalid => 1001,
            Self::MalformedPayload(_) => 1002,
            Self::MissingOrderId { .. } => 1003,
            Self::MissingPaymentId { .. } => 1004,
            Self::OrderAlreadyProcessed(_) => 1005,
            Self::PaymentNotCaptured(_) => 1006,
            Self::AmountMismatch { .. } => 1007,
            Self::PaymentAlreadyUsed(_) => 1008,
            Self::PaymentOrderMismatch { .. } => 1009,
            Self::OrderNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::DownstreamProvider { .. } => 3002,
            Self::RateLimited { .. } => 429,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::SignatureInvalid
            | Self::MalformedPayload(_)
            | Self::MissingOrderId { .. }
            | Self::MissingPaymentId { .. }
            | Self::OrderAlreadyProcessed(_)
            | Self::PaymentNotCaptured(_)
            | Self::AmountMismatch { .. }
            | Self::PaymentAlreadyUsed(_)
            | Self::PaymentOrderMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::DownstreamProvider { .. } => StatusCode::BAD_GATEWAY,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to callers.
    ///
    /// Server-side failures are reported generically; the full error is
    /// logged instead.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::DownstreamProvider { provider, .. } => {
                format!("Failed to reach {provider}")
            }
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        } else {
            tracing::warn!(error = %self, code = self.error_code(), "request rejected");
        }
        let body = ErrorResponse {
            success: false,
            message: self.public_message(),
            code: self.error_code(),
            details: None,
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if let Self::RateLimited { retry_after_ms } = self {
            let secs = retry_after_ms.div_ceil(1000).to_string();
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs) {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
