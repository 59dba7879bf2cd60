//! Shared fixtures for the integration suites: in-memory store, fake
//! providers and a fully wired router.

#![allow(dead_code, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use settlement_gateway::api;
use settlement_gateway::app_state::AppState;
use settlement_gateway::config::{PackageDefaults, RazorpayConfig};
use settlement_gateway::domain::signature::{self, SignatureScheme};
use settlement_gateway::domain::{
    EventBus, Order, OrderId, OrderItem, SettlementEvent, ShippingAddress, ShippingSelection,
};
use settlement_gateway::error::GatewayError;
use settlement_gateway::persistence::{InMemoryOrderStore, OrderStore};
use settlement_gateway::providers::razorpay::{CreateOrderRequest, ProviderOrder, ProviderPayment};
use settlement_gateway::providers::shiprocket::{
    CourierOption, CreatedShipment, RateQuoteRequest, ShipmentRequest, TrackingStatus,
};
use settlement_gateway::providers::{PaymentProvider, ShippingProvider};
use settlement_gateway::rate_limit::RateLimiter;
use settlement_gateway::service::{
    SettlementService, ShipmentDefaults, ShippingService, SideEffectOrchestrator,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const KEY_SECRET: &str = "rzp_secret_integration";
pub const PROVIDER_ORDER_ID: &str = "order_P9A33XWu170gUtm";

#[derive(Debug, Default)]
pub struct FakePayments {
    payments: HashMap<String, ProviderPayment>,
}

#[async_trait]
impl PaymentProvider for FakePayments {
    fn key_id(&self) -> Option<&str> {
        Some("rzp_test_integration")
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<ProviderOrder, GatewayError> {
        Ok(ProviderOrder {
            id: PROVIDER_ORDER_ID.to_string(),
            entity: "order".to_string(),
            amount: request.amount,
            amount_paid: 0,
            amount_due: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: "created".to_string(),
            created_at: 1_700_000_000,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, GatewayError> {
        self.payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::razorpay("The id provided does not exist"))
    }
}

#[derive(Debug, Default)]
pub struct FakeShipping {
    pub shipments: AtomicUsize,
}

impl FakeShipping {
    pub fn created(&self) -> usize {
        self.shipments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShippingProvider for FakeShipping {
    async fn quote_rates(
        &self,
        _request: &RateQuoteRequest,
    ) -> Result<Vec<CourierOption>, GatewayError> {
        Ok(Vec::new())
    }

    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, GatewayError> {
        let n = self.shipments.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreatedShipment {
            shipment_id: format!("{n}{}", &request.customer_pincode),
            tracking_number: Some(format!("TRK{n}")),
            awb_number: Some(format!("AWB{n}")),
            courier_name: Some("Xpressbees".to_string()),
        })
    }

    async fn track(&self, _tracking_number: &str) -> Result<TrackingStatus, GatewayError> {
        Ok(TrackingStatus {
            current_status: Some("Delivered".to_string()),
            ..TrackingStatus::default()
        })
    }
}

pub struct Harness {
    pub store: Arc<InMemoryOrderStore>,
    pub shipping: Arc<FakeShipping>,
    pub state: AppState,
    pub router: Router,
}

pub fn captured(id: &str, amount: i64) -> ProviderPayment {
    ProviderPayment {
        id: id.to_string(),
        status: "captured".to_string(),
        amount,
        currency: Some("INR".to_string()),
        order_id: Some(PROVIDER_ORDER_ID.to_string()),
    }
}

pub fn harness(payments: Vec<ProviderPayment>, max_requests: u32) -> Harness {
    let store = Arc::new(InMemoryOrderStore::new());
    let shipping_provider = Arc::new(FakeShipping::default());
    let event_bus = EventBus::new(64);

    let shipping = Arc::new(ShippingService::new(
        Arc::clone(&store) as Arc<dyn OrderStore>,
        Arc::clone(&shipping_provider) as Arc<dyn ShippingProvider>,
        ShipmentDefaults {
            pickup_pincode: "110001".to_string(),
            country: "India".to_string(),
            package: PackageDefaults::default(),
        },
    ));
    let effects = SideEffectOrchestrator::new(
        Arc::clone(&store) as Arc<dyn OrderStore>,
        Arc::clone(&shipping),
        event_bus.clone(),
        Duration::from_secs(5),
    );
    let settlement = Arc::new(SettlementService::new(
        Arc::clone(&store) as Arc<dyn OrderStore>,
        Arc::new(FakePayments {
            payments: payments.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }),
        effects,
        event_bus.clone(),
        RazorpayConfig {
            key_id: Some("rzp_test_integration".to_string()),
            key_secret: Some(KEY_SECRET.to_string()),
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
        },
        2,
    ));
    let state = AppState {
        settlement,
        shipping,
        rate_limiter: Arc::new(RateLimiter::new(max_requests, Duration::from_secs(60))),
        event_bus,
    };
    let router = api::app(state.clone(), Duration::from_secs(10));

    Harness {
        store,
        shipping: shipping_provider,
        state,
        router,
    }
}

impl Harness {
    /// Inserts a pending ₹499.00 order with one line item and shipping
    /// details; returns the order id and the product id.
    pub async fn seed_order(&self, stock: i32) -> (OrderId, uuid::Uuid) {
        let id = OrderId::new();
        let product = uuid::Uuid::new_v4();
        self.store.set_inventory(product, stock).await;
        let order = Order::pending(id, Decimal::new(49_900, 2)).with_shipping(
            ShippingAddress {
                name: "Asha Rao".to_string(),
                phone: "9876543210".to_string(),
                line1: "12 MG Road".to_string(),
                city: "Bengaluru".to_string(),
                state: "Karnataka".to_string(),
                postal_code: "560001".to_string(),
                country: None,
            },
            ShippingSelection {
                courier_id: 24,
                pickup_pincode: None,
            },
        );
        self.store
            .insert_order(
                order,
                vec![OrderItem {
                    product_id: Some(product),
                    quantity: 1,
                }],
            )
            .await;
        (id, product)
    }

    pub async fn order(&self, id: OrderId) -> Order {
        let Ok(Some(order)) = self.store.get_order(id).await else {
            panic!("order {id} missing");
        };
        order
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let Ok(response) = self.router.clone().oneshot(request).await else {
            panic!("router failed");
        };
        let status = response.status();
        let Ok(bytes) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

/// Waits for the next `EffectsCompleted` event.
pub async fn effects_completed(
    rx: &mut tokio::sync::broadcast::Receiver<SettlementEvent>,
) -> SettlementEvent {
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event @ SettlementEvent::EffectsCompleted { .. }) => return event,
                Ok(_) => {}
                Err(err) => panic!("event bus closed: {err}"),
            }
        }
    };
    let Ok(event) = tokio::time::timeout(Duration::from_secs(5), wait).await else {
        panic!("side effects did not complete");
    };
    event
}

pub fn captured_webhook_body(order_id: OrderId, payment_id: &str, amount: i64) -> String {
    json!({
        "entity": "event",
        "account_id": "acc_BFQ7uQEaa7j2z7",
        "event": "payment.captured",
        "contains": ["payment"],
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": amount,
                    "currency": "INR",
                    "status": "captured",
                    "order_id": PROVIDER_ORDER_ID,
                    "notes": { "orderId": order_id.to_string() }
                }
            }
        },
        "created_at": 1_700_000_000
    })
    .to_string()
}

pub fn webhook_request(body: &str, signature: Option<&str>, client: &str) -> Request<Body> {
    let mut builder = Request::post("/webhooks/razorpay")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client);
    if let Some(sig) = signature {
        builder = builder.header(signature::WEBHOOK_SIGNATURE_HEADER, sig);
    }
    let Ok(request) = builder.body(Body::from(body.to_string())) else {
        panic!("request build failed");
    };
    request
}

pub fn signed_webhook(body: &str) -> Request<Body> {
    let Some(sig) = signature::sign(SignatureScheme::Base64, body.as_bytes(), WEBHOOK_SECRET)
    else {
        panic!("signing failed");
    };
    webhook_request(body, Some(&sig), "198.51.100.10")
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    let Ok(request) = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
    else {
        panic!("request build failed");
    };
    request
}

pub fn verify_body(order_id: &str, payment_id: &str) -> Value {
    let message = signature::payment_message(PROVIDER_ORDER_ID, payment_id);
    let Some(sig) = signature::sign(SignatureScheme::Hex, message.as_bytes(), KEY_SECRET) else {
        panic!("signing failed");
    };
    json!({
        "razorpay_payment_id": payment_id,
        "razorpay_order_id": PROVIDER_ORDER_ID,
        "razorpay_signature": sig,
        "order_id": order_id,
    })
}
