//! Settlement service: webhook handling, checkout verification and
//! payment order creation.
//!
//! Both settlement paths end in the same conditional status update. The
//! webhook path trusts the signed payload; the verification path also
//! fetches the payment from the provider and reconciles its amount
//! against the stored order total before committing.

use std::sync::Arc;

use chrono::Utc;

use super::SideEffectOrchestrator;
use crate::config::RazorpayConfig;
use crate::domain::payment_event::{self, Classification, SettlementIntent, WebhookEnvelope};
use crate::domain::{
    EventBus, OrderId, OrderStatus, SettlementEvent, SettlementSource, TransitionPlan, amount,
    signature, transition,
};
use crate::error::GatewayError;
use crate::persistence::{OrderStore, StatusUpdate};
use crate::providers::PaymentProvider;
use crate::providers::razorpay::{CreateOrderRequest, ProviderOrder};

/// How a webhook delivery was resolved. Every variant is acknowledged
/// with 200 so the provider stops redelivering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A status update was committed.
    Applied {
        /// Order identifier.
        order_id: OrderId,
        /// Status before the update.
        from: OrderStatus,
        /// Status after the update.
        to: OrderStatus,
    },
    /// The order was already settled with this payment.
    Duplicate {
        /// Order identifier.
        order_id: OrderId,
    },
    /// The state machine does not permit the requested edge.
    NotPermitted {
        /// Order identifier.
        order_id: OrderId,
        /// Stored status.
        current: OrderStatus,
        /// Requested status.
        target: OrderStatus,
    },
    /// Another writer changed the order between read and update.
    Superseded {
        /// Order identifier.
        order_id: OrderId,
    },
    /// The payment already settled a different order.
    PaymentReused {
        /// Order identifier.
        order_id: OrderId,
        /// Order that holds the payment.
        holder: OrderId,
    },
    /// The referenced order does not exist.
    OrderMissing {
        /// Order identifier.
        order_id: OrderId,
    },
    /// The event type is not acted upon.
    Ignored {
        /// Provider event type.
        event_type: String,
    },
}

impl WebhookOutcome {
    /// Acknowledgement message returned to the provider.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "Webhook processed successfully",
            Self::Duplicate { .. } => "Webhook already processed",
            Self::NotPermitted { .. } | Self::Superseded { .. } => {
                "Webhook acknowledged; order state unchanged"
            }
            Self::PaymentReused { .. } => {
                "Webhook acknowledged; payment already applied to another order"
            }
            Self::OrderMissing { .. } => "Webhook acknowledged; order not found",
            Self::Ignored { .. } => "Event ignored",
        }
    }
}

/// Result of a successful checkout verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// This call committed the order as `paid`.
    Settled,
    /// The order was already `paid` with the same payment.
    AlreadySettled,
}

impl VerificationOutcome {
    /// Message returned to the client.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Settled => "Payment verified successfully",
            Self::AlreadySettled => "Payment already verified",
        }
    }
}

/// Checkout callback fields after presence and UUID checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerification {
    /// Application order.
    pub order_id: OrderId,
    /// Provider order id (`order_…`).
    pub provider_order_id: String,
    /// Provider payment id (`pay_…`).
    pub provider_payment_id: String,
    /// Hex HMAC from the checkout widget.
    pub signature: String,
}

/// A created provider order together with the public checkout key.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    /// Provider order.
    pub order: ProviderOrder,
    /// Public key id for the checkout widget.
    pub key_id: Option<String>,
}

/// Orchestrates both settlement paths.
///
/// Every path follows the same pattern: authenticate → load order →
/// idempotency check → plan transition → conditional update → publish
/// event → schedule side effects when newly paid.
#[derive(Debug, Clone)]
pub struct SettlementService {
    store: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentProvider>,
    effects: SideEffectOrchestrator,
    event_bus: EventBus,
    razorpay: RazorpayConfig,
    currency_exponent: u32,
}

impl SettlementService {
    /// Creates a new `SettlementService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentProvider>,
        effects: SideEffectOrchestrator,
        event_bus: EventBus,
        razorpay: RazorpayConfig,
        currency_exponent: u32,
    ) -> Self {
        Self {
            store,
            payments,
            effects,
            event_bus,
            razorpay,
            currency_exponent,
        }
    }

    /// Handles one webhook delivery.
    ///
    /// `body` must be the exact bytes received; the signature covers them
    /// and nothing else.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SignatureInvalid`] if the signature does not verify.
    /// - [`GatewayError::MalformedPayload`], [`GatewayError::MissingOrderId`]
    ///   or [`GatewayError::MissingPaymentId`] for unusable payloads.
    /// - [`GatewayError::Persistence`] if the store fails; the provider will
    ///   redeliver.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        provided_signature: Option<&str>,
    ) -> Result<WebhookOutcome, GatewayError> {
        if !signature::verify_webhook(
            body,
            provided_signature,
            self.razorpay.webhook_secret.as_deref(),
        ) {
            let redacted = provided_signature.map_or_else(|| "<missing>".to_string(), signature::redact);
            tracing::warn!(
                signature = %redacted,
                configured = self.razorpay.webhook_secret.is_some(),
                "webhook signature rejected"
            );
            return Err(GatewayError::SignatureInvalid);
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

        let intent = match payment_event::classify(&envelope)? {
            Classification::Intent(intent) => intent,
            Classification::Unhandled(event_type) => {
                tracing::info!(event_type = %event_type, "unhandled webhook event acknowledged");
                self.ignored(&event_type, "unhandled event type");
                return Ok(WebhookOutcome::Ignored { event_type });
            }
        };
        tracing::info!(
            event_type = intent.kind.as_str(),
            order_id = %intent.order_id,
            payment_id = %intent.payment_id,
            "webhook received"
        );

        self.apply_intent(&intent).await
    }

    async fn apply_intent(&self, intent: &SettlementIntent) -> Result<WebhookOutcome, GatewayError> {
        let order_id = intent.order_id;
        let Some(order) = self.store.get_order(order_id).await? else {
            tracing::warn!(%order_id, event_type = intent.kind.as_str(), "webhook for unknown order");
            self.ignored(intent.kind.as_str(), "order not found");
            return Ok(WebhookOutcome::OrderMissing { order_id });
        };

        let target = intent.target_status();
        if target == OrderStatus::Paid && order.is_settled_with(&intent.payment_id) {
            tracing::info!(%order_id, "duplicate settlement webhook");
            return Ok(WebhookOutcome::Duplicate { order_id });
        }

        let plan = transition::plan(order.status, target);
        let TransitionPlan::Apply { from, to } = plan else {
            tracing::info!(
                %order_id,
                current = %order.status,
                target = %target,
                "transition not permitted; acknowledged"
            );
            self.ignored(intent.kind.as_str(), "transition not permitted");
            return Ok(WebhookOutcome::NotPermitted {
                order_id,
                current: order.status,
                target,
            });
        };

        if to == OrderStatus::Paid
            && let Some(outcome) = self.reused(intent).await?
        {
            return Ok(outcome);
        }

        let update = StatusUpdate {
            expected: from,
            status: to,
            payment_id: Some(intent.payment_id.clone()),
            updated_at: Utc::now(),
        };
        if !self.store.transition(order_id, &update).await? {
            if self.settled_with(order_id, &intent.payment_id).await? {
                return Ok(WebhookOutcome::Duplicate { order_id });
            }
            if to == OrderStatus::Paid
                && let Some(outcome) = self.reused(intent).await?
            {
                return Ok(outcome);
            }
            tracing::info!(%order_id, "order changed concurrently; webhook acknowledged");
            return Ok(WebhookOutcome::Superseded { order_id });
        }

        self.committed(order_id, &update, SettlementSource::Webhook, plan);
        Ok(WebhookOutcome::Applied { order_id, from, to })
    }

    /// Verifies a checkout callback and settles the order.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SignatureInvalid`] if the callback signature fails.
    /// - [`GatewayError::OrderNotFound`] if the order does not exist.
    /// - [`GatewayError::OrderAlreadyProcessed`] if the order left `pending`
    ///   through another payment.
    /// - [`GatewayError::PaymentAlreadyUsed`] if the payment already settled
    ///   a different order.
    /// - [`GatewayError::PaymentOrderMismatch`] if the provider reports the
    ///   payment under a different provider order than the callback signed.
    /// - [`GatewayError::PaymentNotCaptured`] if funds are not captured.
    /// - [`GatewayError::AmountMismatch`] if the captured amount differs
    ///   from the order total.
    /// - [`GatewayError::DownstreamProvider`] or
    ///   [`GatewayError::Persistence`] on infrastructure failures.
    pub async fn verify_payment(
        &self,
        request: &PaymentVerification,
    ) -> Result<VerificationOutcome, GatewayError> {
        let order_id = request.order_id;
        if !signature::verify_payment(
            &request.provider_order_id,
            &request.provider_payment_id,
            &request.signature,
            self.razorpay.key_secret.as_deref(),
        ) {
            tracing::warn!(
                %order_id,
                signature = %signature::redact(&request.signature),
                "payment signature rejected"
            );
            return Err(GatewayError::SignatureInvalid);
        }

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(GatewayError::OrderNotFound(order_id))?;
        if order.is_settled_with(&request.provider_payment_id) {
            tracing::info!(%order_id, "duplicate verification");
            return Ok(VerificationOutcome::AlreadySettled);
        }
        if order.status != OrderStatus::Pending {
            return Err(GatewayError::OrderAlreadyProcessed(order.status));
        }
        self.ensure_payment_unused(order_id, &request.provider_payment_id)
            .await?;

        let payment = self
            .payments
            .fetch_payment(&request.provider_payment_id)
            .await?;
        if payment.order_id.as_deref() != Some(request.provider_order_id.as_str()) {
            tracing::warn!(
                %order_id,
                payment_id = %payment.id,
                provider_order_id = %request.provider_order_id,
                payment_order_id = payment.order_id.as_deref().unwrap_or_default(),
                "payment belongs to a different provider order"
            );
            return Err(GatewayError::PaymentOrderMismatch {
                payment_id: payment.id,
                provider_order_id: request.provider_order_id.clone(),
            });
        }
        if !payment.is_captured() {
            return Err(GatewayError::PaymentNotCaptured(payment.status));
        }
        amount::reconcile(payment.amount, order.total, self.currency_exponent)?;

        let plan = transition::plan(OrderStatus::Pending, OrderStatus::Paid);
        let update = StatusUpdate {
            expected: OrderStatus::Pending,
            status: OrderStatus::Paid,
            payment_id: Some(request.provider_payment_id.clone()),
            updated_at: Utc::now(),
        };
        if !self.store.transition(order_id, &update).await? {
            let current = self
                .store
                .get_order(order_id)
                .await?
                .ok_or(GatewayError::OrderNotFound(order_id))?;
            if current.is_settled_with(&request.provider_payment_id) {
                return Ok(VerificationOutcome::AlreadySettled);
            }
            self.ensure_payment_unused(order_id, &request.provider_payment_id)
                .await?;
            return Err(GatewayError::OrderAlreadyProcessed(current.status));
        }

        self.committed(order_id, &update, SettlementSource::Verification, plan);
        Ok(VerificationOutcome::Settled)
    }

    /// Creates a provider order ahead of checkout.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for a non-positive amount, blank
    ///   currency or receipt, or a provider rejection.
    /// - [`GatewayError::DownstreamProvider`] on provider failures.
    pub async fn create_payment_order(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<PaymentOrder, GatewayError> {
        if request.amount <= 0 {
            return Err(GatewayError::InvalidRequest(
                "amount must be positive".to_string(),
            ));
        }
        if request.currency.trim().is_empty() || request.receipt.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "currency and receipt are required".to_string(),
            ));
        }
        let order = self.payments.create_order(request).await?;
        Ok(PaymentOrder {
            order,
            key_id: self.payments.key_id().map(str::to_string),
        })
    }

    async fn settled_with(&self, order_id: OrderId, payment_id: &str) -> Result<bool, GatewayError> {
        Ok(self
            .store
            .get_order(order_id)
            .await?
            .is_some_and(|order| order.is_settled_with(payment_id)))
    }

    async fn ensure_payment_unused(
        &self,
        order_id: OrderId,
        payment_id: &str,
    ) -> Result<(), GatewayError> {
        match self.store.order_with_payment(payment_id, order_id).await? {
            Some(holder) => {
                tracing::warn!(%order_id, %holder, payment_id, "payment already applied to another order");
                Err(GatewayError::PaymentAlreadyUsed(payment_id.to_string()))
            }
            None => Ok(()),
        }
    }

    async fn reused(
        &self,
        intent: &SettlementIntent,
    ) -> Result<Option<WebhookOutcome>, GatewayError> {
        let order_id = intent.order_id;
        let Some(holder) = self
            .store
            .order_with_payment(&intent.payment_id, order_id)
            .await?
        else {
            return Ok(None);
        };
        tracing::warn!(
            %order_id,
            %holder,
            payment_id = %intent.payment_id,
            "webhook payment already applied to another order"
        );
        self.ignored(intent.kind.as_str(), "payment already applied to another order");
        Ok(Some(WebhookOutcome::PaymentReused { order_id, holder }))
    }

    fn committed(
        &self,
        order_id: OrderId,
        update: &StatusUpdate,
        source: SettlementSource,
        plan: TransitionPlan,
    ) {
        tracing::info!(
            %order_id,
            from = %update.expected,
            to = %update.status,
            ?source,
            "order transitioned"
        );
        let _ = self.event_bus.publish(SettlementEvent::OrderTransitioned {
            order_id,
            from: update.expected,
            to: update.status,
            payment_id: update.payment_id.clone(),
            source,
            timestamp: update.updated_at,
        });
        if plan.settles() {
            drop(self.effects.schedule(order_id));
        }
    }

    fn ignored(&self, provider_event: &str, reason: &str) {
        let _ = self.event_bus.publish(SettlementEvent::WebhookIgnored {
            provider_event: provider_event.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::config::PackageDefaults;
    use crate::domain::Order;
    use crate::domain::signature::SignatureScheme;
    use crate::persistence::InMemoryOrderStore;
    use crate::providers::ShippingProvider;
    use crate::providers::razorpay::ProviderPayment;
    use crate::providers::shiprocket::{
        CourierOption, CreatedShipment, RateQuoteRequest, ShipmentRequest, TrackingStatus,
    };
    use crate::service::{ShipmentDefaults, ShippingService};

    const WEBHOOK_SECRET: &str = "whsec_test";
    const KEY_SECRET: &str = "key_secret_test";

    #[derive(Debug, Default)]
    struct StubPayments {
        payments: HashMap<String, ProviderPayment>,
    }

    #[async_trait]
    impl PaymentProvider for StubPayments {
        fn key_id(&self) -> Option<&str> {
            Some("rzp_test_key")
        }

        async fn create_order(
            &self,
            request: &CreateOrderRequest,
        ) -> Result<ProviderOrder, GatewayError> {
            Ok(ProviderOrder {
                id: "order_P1".to_string(),
                entity: "order".to_string(),
                amount: request.amount,
                amount_paid: 0,
                amount_due: request.amount,
                currency: request.currency.clone(),
                receipt: Some(request.receipt.clone()),
                status: "created".to_string(),
                created_at: 0,
            })
        }

        async fn fetch_payment(&self, payment_id: &str) -> Result<ProviderPayment, GatewayError> {
            self.payments
                .get(payment_id)
                .cloned()
                .ok_or_else(|| GatewayError::razorpay("payment not found"))
        }
    }

    #[derive(Debug)]
    struct NoShipping;

    #[async_trait]
    impl ShippingProvider for NoShipping {
        async fn quote_rates(
            &self,
            _request: &RateQuoteRequest,
        ) -> Result<Vec<CourierOption>, GatewayError> {
            Ok(Vec::new())
        }

        async fn create_shipment(
            &self,
            _request: &ShipmentRequest,
        ) -> Result<CreatedShipment, GatewayError> {
            Err(GatewayError::shiprocket("not available"))
        }

        async fn track(&self, _tracking_number: &str) -> Result<TrackingStatus, GatewayError> {
            Ok(TrackingStatus::default())
        }
    }

    fn payment(id: &str, status: &str, amount: i64) -> ProviderPayment {
        ProviderPayment {
            id: id.to_string(),
            status: status.to_string(),
            amount,
            currency: Some("INR".to_string()),
            order_id: Some("order_P1".to_string()),
        }
    }

    fn service(store: Arc<InMemoryOrderStore>, payments: Vec<ProviderPayment>) -> SettlementService {
        let event_bus = EventBus::new(64);
        let shipping = ShippingService::new(
            Arc::clone(&store) as Arc<dyn OrderStore>,
            Arc::new(NoShipping),
            ShipmentDefaults {
                pickup_pincode: "110001".to_string(),
                country: "India".to_string(),
                package: PackageDefaults::default(),
            },
        );
        let effects = SideEffectOrchestrator::new(
            Arc::clone(&store) as Arc<dyn OrderStore>,
            Arc::new(shipping),
            event_bus.clone(),
            Duration::from_secs(5),
        );
        let payments = StubPayments {
            payments: payments.into_iter().map(|p| (p.id.clone(), p)).collect(),
        };
        SettlementService::new(
            store,
            Arc::new(payments),
            effects,
            event_bus,
            RazorpayConfig {
                key_id: Some("rzp_test_key".to_string()),
                key_secret: Some(KEY_SECRET.to_string()),
                webhook_secret: Some(WEBHOOK_SECRET.to_string()),
                api_base: "http://127.0.0.1:9".to_string(),
            },
            2,
        )
    }

    async fn pending_order(store: &InMemoryOrderStore) -> OrderId {
        let id = OrderId::new();
        store
            .insert_order(Order::pending(id, Decimal::new(49_900, 2)), Vec::new())
            .await;
        id
    }

    fn webhook(event: &str, order_id: OrderId, payment_id: &str) -> (Vec<u8>, String) {
        let body = json!({
            "event": event,
            "payload": {
                "payment": { "entity": {
                    "id": payment_id,
                    "amount": 49900,
                    "notes": { "orderId": order_id.to_string() }
                }}
            }
        })
        .to_string()
        .into_bytes();
        let Some(sig) = signature::sign(SignatureScheme::Base64, &body, WEBHOOK_SECRET) else {
            panic!("signing failed");
        };
        (body, sig)
    }

    fn verification(order_id: OrderId, payment_id: &str) -> PaymentVerification {
        let message = signature::payment_message("order_P1", payment_id);
        let Some(sig) = signature::sign(SignatureScheme::Hex, message.as_bytes(), KEY_SECRET)
        else {
            panic!("signing failed");
        };
        PaymentVerification {
            order_id,
            provider_order_id: "order_P1".to_string(),
            provider_payment_id: payment_id.to_string(),
            signature: sig,
        }
    }

    #[tokio::test]
    async fn captured_webhook_settles_then_duplicates() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(Arc::clone(&store), Vec::new());
        let (body, sig) = webhook("payment.captured", id, "pay_1");

        let first = svc.handle_webhook(&body, Some(&sig)).await;
        assert!(matches!(
            first,
            Ok(WebhookOutcome::Applied {
                to: OrderStatus::Paid,
                ..
            })
        ));
        let second = svc.handle_webhook(&body, Some(&sig)).await;
        assert!(matches!(second, Ok(WebhookOutcome::Duplicate { .. })));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_parsing() {
        let store = Arc::new(InMemoryOrderStore::new());
        let svc = service(store, Vec::new());
        let result = svc.handle_webhook(b"not json", Some("AAAA")).await;
        assert!(matches!(result, Err(GatewayError::SignatureInvalid)));
        let result = svc.handle_webhook(b"{}", None).await;
        assert!(matches!(result, Err(GatewayError::SignatureInvalid)));
    }

    #[tokio::test]
    async fn cancelled_order_is_not_paid_by_late_capture() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(Arc::clone(&store), Vec::new());

        let (failed, sig) = webhook("payment.failed", id, "pay_1");
        assert!(matches!(
            svc.handle_webhook(&failed, Some(&sig)).await,
            Ok(WebhookOutcome::Applied {
                to: OrderStatus::Cancelled,
                ..
            })
        ));
        let (captured, sig) = webhook("payment.captured", id, "pay_2");
        assert!(matches!(
            svc.handle_webhook(&captured, Some(&sig)).await,
            Ok(WebhookOutcome::NotPermitted {
                current: OrderStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn webhook_for_unknown_order_is_acknowledged() {
        let store = Arc::new(InMemoryOrderStore::new());
        let svc = service(store, Vec::new());
        let (body, sig) = webhook("payment.captured", OrderId::new(), "pay_1");
        assert!(matches!(
            svc.handle_webhook(&body, Some(&sig)).await,
            Ok(WebhookOutcome::OrderMissing { .. })
        ));
    }

    #[tokio::test]
    async fn verification_settles_matching_capture() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(
            Arc::clone(&store),
            vec![payment("pay_1", "captured", 49_900)],
        );

        let request = verification(id, "pay_1");
        assert!(matches!(
            svc.verify_payment(&request).await,
            Ok(VerificationOutcome::Settled)
        ));
        assert!(matches!(
            svc.verify_payment(&request).await,
            Ok(VerificationOutcome::AlreadySettled)
        ));
    }

    #[tokio::test]
    async fn verification_rejects_short_capture_and_keeps_pending() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(
            Arc::clone(&store),
            vec![payment("pay_1", "captured", 48_000)],
        );

        let result = svc.verify_payment(&verification(id, "pay_1")).await;
        assert!(matches!(
            result,
            Err(GatewayError::AmountMismatch {
                expected: 49_900,
                captured: 48_000
            })
        ));
        let Ok(Some(order)) = store.get_order(id).await else {
            panic!("order missing");
        };
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_id, None);
    }

    #[tokio::test]
    async fn verification_requires_capture() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(
            Arc::clone(&store),
            vec![payment("pay_1", "authorized", 49_900)],
        );
        assert!(matches!(
            svc.verify_payment(&verification(id, "pay_1")).await,
            Err(GatewayError::PaymentNotCaptured(status)) if status == "authorized"
        ));
    }

    #[tokio::test]
    async fn verification_with_other_payment_after_settlement_is_rejected() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(
            Arc::clone(&store),
            vec![
                payment("pay_1", "captured", 49_900),
                payment("pay_2", "captured", 49_900),
            ],
        );
        assert!(svc.verify_payment(&verification(id, "pay_1")).await.is_ok());
        assert!(matches!(
            svc.verify_payment(&verification(id, "pay_2")).await,
            Err(GatewayError::OrderAlreadyProcessed(OrderStatus::Paid))
        ));
    }

    #[tokio::test]
    async fn payment_cannot_settle_a_second_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let first = pending_order(&store).await;
        let second = pending_order(&store).await;
        let svc = service(
            Arc::clone(&store),
            vec![payment("pay_1", "captured", 49_900)],
        );
        assert!(matches!(
            svc.verify_payment(&verification(first, "pay_1")).await,
            Ok(VerificationOutcome::Settled)
        ));
        assert!(matches!(
            svc.verify_payment(&verification(second, "pay_1")).await,
            Err(GatewayError::PaymentAlreadyUsed(id)) if id == "pay_1"
        ));

        let (body, sig) = webhook("payment.captured", second, "pay_1");
        assert!(matches!(
            svc.handle_webhook(&body, Some(&sig)).await,
            Ok(WebhookOutcome::PaymentReused { holder, .. }) if holder == first
        ));

        let Ok(Some(order)) = store.get_order(second).await else {
            panic!("order missing");
        };
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_id, None);
    }

    #[tokio::test]
    async fn verification_rejects_payment_of_another_provider_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let mut foreign = payment("pay_1", "captured", 49_900);
        foreign.order_id = Some("order_Other".to_string());
        let svc = service(Arc::clone(&store), vec![foreign]);

        assert!(matches!(
            svc.verify_payment(&verification(id, "pay_1")).await,
            Err(GatewayError::PaymentOrderMismatch { .. })
        ));
        let Ok(Some(order)) = store.get_order(id).await else {
            panic!("order missing");
        };
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn verification_with_forged_signature_is_rejected() {
        let store = Arc::new(InMemoryOrderStore::new());
        let id = pending_order(&store).await;
        let svc = service(Arc::clone(&store), Vec::new());
        let mut request = verification(id, "pay_1");
        request.provider_payment_id = "pay_other".to_string();
        assert!(matches!(
            svc.verify_payment(&request).await,
            Err(GatewayError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn payment_order_validation() {
        let store = Arc::new(InMemoryOrderStore::new());
        let svc = service(store, Vec::new());
        let request = CreateOrderRequest {
            amount: 0,
            currency: "INR".to_string(),
            receipt: "order_1".to_string(),
            notes: json!({}),
        };
        assert!(matches!(
            svc.create_payment_order(&request).await,
            Err(GatewayError::InvalidRequest(_))
        ));

        let request = CreateOrderRequest {
            amount: 49_900,
            ..request
        };
        let Ok(created) = svc.create_payment_order(&request).await else {
            panic!("order creation should succeed");
        };
        assert_eq!(created.order.id, "order_P1");
        assert_eq!(created.key_id.as_deref(), Some("rzp_test_key"));
    }
}
