//! Type-safe order identifier.
//!
//! [`OrderId`] is a newtype wrapper around [`uuid::Uuid`] so that order
//! identifiers cannot be confused with product ids or provider references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayError;

/// Unique identifier of a marketplace order.
///
/// Assigned when the order is placed and immutable thereafter. Provider
/// references (`order_…`, `pay_…`) are plain strings and never an `OrderId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OrderId(uuid::Uuid);

impl OrderId {
    /// Creates a new random `OrderId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `OrderId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Parses a client-supplied id, accepting only the canonical hyphenated
    /// form of an RFC 4122 UUID with version 1 through 5.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for any other input,
    /// including simple, braced and URN encodings.
    pub fn parse_canonical(raw: &str) -> Result<Self, GatewayError> {
        let invalid = || GatewayError::InvalidRequest("invalid order id format".to_string());
        if raw.len() != 36 {
            return Err(invalid());
        }
        let uuid = uuid::Uuid::try_parse(raw).map_err(|_| invalid())?;
        let version_ok = matches!(uuid.get_version_num(), 1..=5);
        let variant_ok = uuid.get_variant() == uuid::Variant::RFC4122;
        if version_ok && variant_ok {
            Ok(Self(uuid))
        } else {
            Err(invalid())
        }
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::try_parse(s).map(Self)
    }
}

impl From<uuid::Uuid> for OrderId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for uuid::Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}
