//! Thin clients for the external payment and shipping providers.
//!
//! Each provider sits behind a trait ([`PaymentProvider`],
//! [`ShippingProvider`]) so the pipeline can be exercised without network
//! access. The `reqwest` implementations bound every call with the
//! configured provider timeout.

pub mod razorpay;
pub mod shiprocket;

use std::time::Duration;

use crate::error::GatewayError;

pub use razorpay::{PaymentProvider, RazorpayClient};
pub use shiprocket::{ShippingProvider, ShiprocketClient};

/// Builds the shared HTTP client configuration.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("settlement-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GatewayError::Internal(format!("http client: {e}")))
}

/// Extracts a human-readable description from a provider error response.
///
/// Razorpay wraps errors as `{"error": {"description": ...}}`; Shiprocket
/// uses `{"message": ...}`. Anything else is returned as raw text.
pub(crate) async fn error_description(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| {
            v.pointer("/error/description")
                .or_else(|| v.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(text)
}
