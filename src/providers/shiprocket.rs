//! Shiprocket REST client.
//!
//! Every call carries a bearer token obtained from `/auth/login`. Tokens
//! are valid for an hour; the client caches one and refreshes it shortly
//! before expiry or after the API answers 401.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::{error_description, http_client};
use crate::config::ShiprocketConfig;
use crate::error::GatewayError;

/// Lifetime the provider grants a login token.
const TOKEN_TTL: Duration = Duration::from_secs(3_600);
/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Parcel and route for a rate quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RateQuoteRequest {
    /// Warehouse PIN code.
    pub pickup_pincode: String,
    /// Destination PIN code.
    pub delivery_pincode: String,
    /// Weight in kilograms.
    pub weight: f64,
    /// Length in centimetres.
    pub length: f64,
    /// Breadth in centimetres.
    pub breadth: f64,
    /// Height in centimetres.
    pub height: f64,
}

/// A courier able to serve a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CourierOption {
    /// Courier company id; stored as the checkout selection.
    pub courier_id: i64,
    /// Display name.
    pub courier_name: String,
    /// Logo URL, possibly empty.
    pub courier_logo: String,
    /// Shipping charge in rupees.
    pub rate: f64,
    /// Estimated transit days.
    pub estimated_delivery_days: String,
    /// Estimated delivery date, possibly empty.
    pub estimated_delivery_date: String,
    /// Cash on delivery supported.
    pub cod_available: bool,
    /// Warehouse PIN code.
    pub pickup_pincode: String,
    /// Destination PIN code.
    pub delivery_pincode: String,
}

/// Shipment submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    /// Application order id.
    pub order_id: String,
    /// Selected courier.
    pub courier_id: i64,
    /// Warehouse PIN code.
    pub pickup_pincode: String,
    /// Destination PIN code.
    pub delivery_pincode: String,
    /// Weight in kilograms.
    pub weight: f64,
    /// Length in centimetres.
    pub length: f64,
    /// Breadth in centimetres.
    pub breadth: f64,
    /// Height in centimetres.
    pub height: f64,
    /// Recipient name.
    pub customer_name: String,
    /// Recipient phone.
    pub customer_phone: String,
    /// Street address.
    pub customer_address: String,
    /// City.
    pub customer_city: String,
    /// State.
    pub customer_state: String,
    /// PIN code.
    pub customer_pincode: String,
    /// Country.
    pub customer_country: String,
}

/// Identifiers of an accepted shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedShipment {
    /// Provider shipment id.
    pub shipment_id: String,
    /// Tracking number.
    pub tracking_number: Option<String>,
    /// Air waybill number.
    pub awb_number: Option<String>,
    /// Assigned courier.
    pub courier_name: Option<String>,
}

/// One scan in a shipment's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct TrackingEvent {
    /// Status label.
    pub status: Option<String>,
    /// Provider status code.
    pub status_code: Option<i64>,
    /// Status description.
    pub status_description: Option<String>,
    /// Scan time as reported.
    pub timestamp: Option<String>,
    /// Scan location.
    pub location: Option<String>,
}

/// Tracking snapshot for an AWB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, ToSchema)]
#[serde(default)]
pub struct TrackingStatus {
    /// Overall status label.
    pub status: Option<String>,
    /// Overall status code.
    pub status_code: Option<i64>,
    /// Overall status description.
    pub status_description: Option<String>,
    /// Latest status label.
    pub current_status: Option<String>,
    /// Latest status code.
    pub current_status_code: Option<i64>,
    /// Latest status description.
    pub current_status_description: Option<String>,
    /// Estimated delivery date.
    pub estimated_delivery_date: Option<String>,
    /// Pickup date.
    pub pickup_date: Option<String>,
    /// Delivery date.
    pub delivered_date: Option<String>,
    /// Scan history.
    pub tracking_events: Vec<TrackingEvent>,
}

/// Shipping-provider operations used by the pipeline.
#[async_trait]
pub trait ShippingProvider: std::fmt::Debug + Send + Sync {
    /// Lists couriers able to serve a route.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DownstreamProvider`] on any failure.
    async fn quote_rates(
        &self,
        request: &RateQuoteRequest,
    ) -> Result<Vec<CourierOption>, GatewayError>;

    /// Submits a shipment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DownstreamProvider`] on any failure.
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, GatewayError>;

    /// Looks up tracking for an AWB / tracking number.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DownstreamProvider`] on any failure.
    async fn track(&self, tracking_number: &str) -> Result<TrackingStatus, GatewayError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// HTTP implementation of [`ShippingProvider`].
#[derive(Debug)]
pub struct ShiprocketClient {
    http: reqwest::Client,
    config: ShiprocketConfig,
    token: RwLock<Option<CachedToken>>,
}

impl ShiprocketClient {
    /// Creates a client whose calls are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the HTTP client cannot be built.
    pub fn new(config: ShiprocketConfig, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client(timeout)?,
            config,
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/external{path}",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Returns a valid bearer token, logging in when needed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DownstreamProvider`] if credentials are
    /// missing or the login fails.
    pub async fn auth_token(&self) -> Result<String, GatewayError> {
        if let Some(cached) = self.token.read().await.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.value.clone());
        }

        let (Some(email), Some(password)) = (&self.config.email, &self.config.password) else {
            return Err(GatewayError::shiprocket("credentials not configured"));
        };

        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| GatewayError::shiprocket(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let description = error_description(response).await;
            return Err(GatewayError::shiprocket(format!(
                "authentication failed ({status}): {description}"
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::shiprocket(format!("unexpected login response: {e}")))?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::shiprocket("no token received"))?
            .to_string();

        *self.token.write().await = Some(CachedToken {
            value: token.clone(),
            refresh_at: Instant::now() + TOKEN_TTL.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        tracing::debug!("shiprocket token refreshed");
        Ok(token)
    }

    /// Sends an authorized request and decodes a JSON body.
    async fn send_json(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value, GatewayError> {
        let token = self.auth_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::shiprocket(e.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            *self.token.write().await = None;
        }
        if !status.is_success() {
            let description = error_description(response).await;
            return Err(GatewayError::shiprocket(format!(
                "{what} failed ({status}): {description}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::shiprocket(format!("unexpected {what} response: {e}")))
    }
}

/// Reads a field that the provider sends either as a string or a number.
fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn courier_from(value: &Value, request: &RateQuoteRequest) -> Option<CourierOption> {
    Some(CourierOption {
        courier_id: value.get("courier_id").and_then(Value::as_i64)?,
        courier_name: text(value, "courier_name").unwrap_or_default(),
        courier_logo: text(value, "courier_logo").unwrap_or_default(),
        rate: value.get("rate").and_then(Value::as_f64).unwrap_or(0.0),
        estimated_delivery_days: text(value, "estimated_delivery_days")
            .unwrap_or_else(|| "3".to_string()),
        estimated_delivery_date: text(value, "estimated_delivery_date").unwrap_or_default(),
        cod_available: match value.get("cod_available") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            _ => false,
        },
        pickup_pincode: request.pickup_pincode.clone(),
        delivery_pincode: request.delivery_pincode.clone(),
    })
}

#[async_trait]
impl ShippingProvider for ShiprocketClient {
    async fn quote_rates(
        &self,
        request: &RateQuoteRequest,
    ) -> Result<Vec<CourierOption>, GatewayError> {
        let body = self
            .send_json(
                self.http.post(self.url("/courier/serviceability/")).json(request),
                "rate quote",
            )
            .await?;
        let couriers = body
            .pointer("/data/available_courier_companies")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(|c| courier_from(c, request)).collect())
            .unwrap_or_default();
        Ok(couriers)
    }

    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, GatewayError> {
        let body = self
            .send_json(
                self.http
                    .post(self.url("/orders/create/adhoc-shipment"))
                    .json(request),
                "shipment creation",
            )
            .await?;
        let shipment_id = text(&body, "shipment_id")
            .ok_or_else(|| GatewayError::shiprocket("shipment response lacks shipment_id"))?;
        Ok(CreatedShipment {
            shipment_id,
            tracking_number: text(&body, "tracking_number"),
            awb_number: text(&body, "awb_number").or_else(|| text(&body, "awb_code")),
            courier_name: text(&body, "courier_name"),
        })
    }

    async fn track(&self, tracking_number: &str) -> Result<TrackingStatus, GatewayError> {
        if !is_tracking_number(tracking_number) {
            return Err(GatewayError::InvalidRequest(
                "tracking number may only contain letters, digits, '-' and '_'".to_string(),
            ));
        }
        let body = self
            .send_json(
                self.http
                    .get(self.url(&format!("/courier/track/awb/{tracking_number}"))),
                "tracking",
            )
            .await?;
        serde_json::from_value(body)
            .map_err(|e| GatewayError::shiprocket(format!("unexpected tracking response: {e}")))
    }
}

/// Returns `true` if `value` is safe to embed as a single URL path segment
/// of the tracking endpoint.
#[must_use]
pub fn is_tracking_number(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
