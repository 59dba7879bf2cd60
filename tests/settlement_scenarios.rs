//! End-to-end settlement scenarios driven through the HTTP router with an
//! in-memory store and fake providers.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::{
    captured, captured_webhook_body, effects_completed, harness, json_request, signed_webhook,
    verify_body, webhook_request,
};
use settlement_gateway::domain::{OrderId, OrderStatus, SettlementEvent, ShipmentOutcome};

#[tokio::test]
async fn captured_webhook_settles_order_and_runs_effects() {
    let h = harness(Vec::new(), 100);
    let (order_id, product) = h.seed_order(5).await;
    let mut rx = h.state.event_bus.subscribe();

    let body = captured_webhook_body(order_id, "pay_A", 49_900);
    let (status, json) = h.send(signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let order = h.order(order_id).await;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment_id.as_deref(), Some("pay_A"));

    let SettlementEvent::EffectsCompleted {
        inventory_updated,
        shipment,
        ..
    } = effects_completed(&mut rx).await
    else {
        panic!("unexpected event");
    };
    assert_eq!(inventory_updated, 1);
    assert!(matches!(shipment, ShipmentOutcome::Created { .. }));
    assert_eq!(h.store.inventory(product).await, Some(4));
    assert_eq!(h.shipping.created(), 1);

    let order = h.order(order_id).await;
    assert_eq!(order.shipment.shipment_status.as_deref(), Some("created"));
    assert_eq!(order.shipment.awb_number.as_deref(), Some("AWB1"));
}

#[tokio::test]
async fn duplicate_webhook_is_acknowledged_without_repeating_effects() {
    let h = harness(Vec::new(), 100);
    let (order_id, product) = h.seed_order(5).await;
    let mut rx = h.state.event_bus.subscribe();
    let body = captured_webhook_body(order_id, "pay_B", 49_900);

    let (first, _) = h.send(signed_webhook(&body)).await;
    assert_eq!(first, StatusCode::OK);
    let _ = effects_completed(&mut rx).await;

    let (second, json) = h.send(signed_webhook(&body)).await;
    assert_eq!(second, StatusCode::OK);
    assert_eq!(json["success"], true);

    let late = tokio::time::timeout(Duration::from_millis(200), async {
        loop {
            if let Ok(SettlementEvent::EffectsCompleted { .. }) = rx.recv().await {
                return;
            }
        }
    })
    .await;
    assert!(late.is_err(), "side effects ran twice");

    let order = h.order(order_id).await;
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment_id.as_deref(), Some("pay_B"));
    assert_eq!(h.store.inventory(product).await, Some(4));
    assert_eq!(h.shipping.created(), 1);
}

#[tokio::test]
async fn concurrent_deliveries_settle_once() {
    let h = harness(Vec::new(), 100);
    let (order_id, product) = h.seed_order(10).await;
    let mut rx = h.state.event_bus.subscribe();
    let body = captured_webhook_body(order_id, "pay_C", 49_900);

    let (a, b) = tokio::join!(
        h.send(signed_webhook(&body)),
        h.send(signed_webhook(&body))
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    let _ = effects_completed(&mut rx).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.store.inventory(product).await, Some(9));
    assert_eq!(h.shipping.created(), 1);
}

#[tokio::test]
async fn verification_with_short_capture_is_rejected() {
    let h = harness(vec![captured("pay_D", 48_000)], 100);
    let (order_id, product) = h.seed_order(5).await;

    let request = json_request(
        "POST",
        "/api/v1/payments/verify",
        &verify_body(&order_id.to_string(), "pay_D"),
    );
    let (status, json) = h.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], 1007);

    let order = h.order(order_id).await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_id, None);
    assert_eq!(h.store.inventory(product).await, Some(5));
}

#[tokio::test]
async fn verification_settles_and_is_idempotent() {
    let h = harness(vec![captured("pay_E", 49_900)], 100);
    let (order_id, product) = h.seed_order(5).await;
    let mut rx = h.state.event_bus.subscribe();
    let body = verify_body(&order_id.to_string(), "pay_E");

    let (status, json) = h
        .send(json_request("POST", "/api/v1/payments/verify", &body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["order_id"], order_id.to_string());
    let _ = effects_completed(&mut rx).await;

    let (status, _) = h
        .send(json_request("POST", "/api/v1/payments/verify", &body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.store.inventory(product).await, Some(4));
    assert_eq!(h.shipping.created(), 1);
}

#[tokio::test]
async fn webhook_after_verification_is_a_duplicate() {
    let h = harness(vec![captured("pay_F", 49_900)], 100);
    let (order_id, product) = h.seed_order(5).await;
    let mut rx = h.state.event_bus.subscribe();

    let body = verify_body(&order_id.to_string(), "pay_F");
    let (status, _) = h
        .send(json_request("POST", "/api/v1/payments/verify", &body))
        .await;
    assert_eq!(status, StatusCode::OK);
    let _ = effects_completed(&mut rx).await;

    let webhook = captured_webhook_body(order_id, "pay_F", 49_900);
    let (status, _) = h.send(signed_webhook(&webhook)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.store.inventory(product).await, Some(4));
    assert_eq!(h.shipping.created(), 1);
}

#[tokio::test]
async fn one_payment_cannot_settle_two_orders() {
    let h = harness(vec![captured("pay_X", 49_900)], 100);
    let (first, first_product) = h.seed_order(5).await;
    let (second, second_product) = h.seed_order(5).await;
    let mut rx = h.state.event_bus.subscribe();

    let (status, _) = h
        .send(json_request(
            "POST",
            "/api/v1/payments/verify",
            &verify_body(&first.to_string(), "pay_X"),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let _ = effects_completed(&mut rx).await;

    let (status, json) = h
        .send(json_request(
            "POST",
            "/api/v1/payments/verify",
            &verify_body(&second.to_string(), "pay_X"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1008);

    let (status, _) = h
        .send(signed_webhook(&captured_webhook_body(second, "pay_X", 49_900)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let order = h.order(second).await;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_id, None);
    assert_eq!(h.order(first).await.payment_id.as_deref(), Some("pay_X"));
    assert_eq!(h.store.inventory(first_product).await, Some(4));
    assert_eq!(h.store.inventory(second_product).await, Some(5));
    assert_eq!(h.shipping.created(), 1);
}

#[tokio::test]
async fn verification_of_payment_from_another_provider_order_is_rejected() {
    let mut foreign = captured("pay_Y", 49_900);
    foreign.order_id = Some("order_Unrelated".to_string());
    let h = harness(vec![foreign], 100);
    let (order_id, _) = h.seed_order(5).await;

    let (status, json) = h
        .send(json_request(
            "POST",
            "/api/v1/payments/verify",
            &verify_body(&order_id.to_string(), "pay_Y"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1009);
    assert_eq!(h.order(order_id).await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn verification_edge_cases_map_to_status_codes() {
    let h = harness(Vec::new(), 100);

    let Ok(malformed) = Request::post("/api/v1/payments/verify")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
    else {
        panic!("request build failed");
    };
    let (status, json) = h.send(malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1002);

    let (status, json) = h
        .send(json_request(
            "POST",
            "/api/v1/payments/verify",
            &json!({ "razorpay_payment_id": "pay_1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1002);

    let (status, _) = h
        .send(json_request(
            "POST",
            "/api/v1/payments/verify",
            &verify_body("12345", "pay_1"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = h
        .send(json_request(
            "POST",
            "/api/v1/payments/verify",
            &verify_body(&OrderId::new().to_string(), "pay_1"),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 2001);

    let (order_id, _) = h.seed_order(1).await;
    let mut forged = verify_body(&order_id.to_string(), "pay_1");
    forged["razorpay_signature"] = json!("00".repeat(32));
    let (status, json) = h
        .send(json_request("POST", "/api/v1/payments/verify", &forged))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1001);
}

#[tokio::test]
async fn unknown_event_is_acknowledged_without_changes() {
    let h = harness(Vec::new(), 100);
    let (order_id, _) = h.seed_order(5).await;
    let before = h.order(order_id).await;

    let body = json!({
        "event": "order.notified",
        "payload": { "order": { "entity": { "notes": { "orderId": order_id.to_string() } } } }
    })
    .to_string();
    let (status, json) = h.send(signed_webhook(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(h.order(order_id).await, before);
}

#[tokio::test]
async fn webhook_rejections() {
    let h = harness(Vec::new(), 100);
    let (order_id, _) = h.seed_order(5).await;
    let body = captured_webhook_body(order_id, "pay_G", 49_900);

    let (status, json) = h
        .send(webhook_request(&body, Some("bm90LWEtc2lnbmF0dXJl"), "198.51.100.20"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1001);

    let (status, _) = h.send(webhook_request(&body, None, "198.51.100.20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = h.send(signed_webhook("{\"event\": ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1002);

    let no_order = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_G", "notes": [] } } }
    })
    .to_string();
    let (status, json) = h.send(signed_webhook(&no_order)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 1003);

    assert_eq!(h.order(order_id).await.status, OrderStatus::Pending);
}

#[tokio::test]
async fn eleventh_request_is_rate_limited_before_signature_check() {
    let h = harness(Vec::new(), 10);
    let body = json!({ "event": "payment.captured", "payload": {} }).to_string();

    for _ in 0..10 {
        let (status, _) = h
            .send(webhook_request(&body, Some("invalid"), "203.0.113.5"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    let Ok(response) = tower::ServiceExt::oneshot(
        h.router.clone(),
        webhook_request(&body, Some("invalid"), "203.0.113.5"),
    )
    .await
    else {
        panic!("router failed");
    };
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    let (status, _) = h
        .send(webhook_request(&body, Some("invalid"), "203.0.113.6"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn refund_moves_paid_order_to_refunded() {
    let h = harness(Vec::new(), 100);
    let (order_id, _) = h.seed_order(5).await;
    let mut rx = h.state.event_bus.subscribe();
    let (status, _) = h
        .send(signed_webhook(&captured_webhook_body(order_id, "pay_H", 49_900)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let _ = effects_completed(&mut rx).await;

    let refund = json!({
        "event": "refund.processed",
        "payload": { "refund": { "entity": {
            "id": "rfnd_1",
            "payment_id": "pay_H",
            "notes": { "orderId": order_id.to_string() }
        } } }
    })
    .to_string();
    let (status, _) = h.send(signed_webhook(&refund)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.order(order_id).await.status, OrderStatus::Refunded);

    let recapture = captured_webhook_body(order_id, "pay_H2", 49_900);
    let (status, _) = h.send(signed_webhook(&recapture)).await;
    assert_eq!(status, StatusCode::OK);
    let order = h.order(order_id).await;
    assert_eq!(order.status, OrderStatus::Refunded);
    assert_eq!(order.payment_id.as_deref(), Some("pay_H"));
}
