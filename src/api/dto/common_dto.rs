//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plain acknowledgement body: `{"success": true, "message": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AckResponse {
    /// Always `true`; failures use [`crate::error::ErrorResponse`].
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl AckResponse {
    /// Builds a successful acknowledgement.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Returns the trimmed value if present and non-blank.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
