//! settlement-gateway server entry point.
//!
//! Starts the Axum HTTP server with the webhook, payment and shipping
//! endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use settlement_gateway::api;
use settlement_gateway::app_state::AppState;
use settlement_gateway::config::GatewayConfig;
use settlement_gateway::domain::EventBus;
use settlement_gateway::persistence::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use settlement_gateway::providers::{RazorpayClient, ShiprocketClient};
use settlement_gateway::rate_limit::RateLimiter;
use settlement_gateway::service::{
    SettlementService, ShipmentDefaults, ShippingService, SideEffectOrchestrator,
    spawn_audit_logger,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting settlement-gateway");
    if config.razorpay.webhook_secret.is_none() {
        tracing::warn!("no webhook secret configured; every webhook will be rejected");
    }

    // Build persistence layer
    let store: Arc<dyn OrderStore> = if config.persistence_enabled {
        let postgres = PostgresOrderStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        if config.run_migrations {
            postgres.migrate().await.context("running migrations")?;
        }
        Arc::new(postgres)
    } else {
        tracing::warn!("persistence disabled; orders are kept in memory");
        Arc::new(InMemoryOrderStore::new())
    };

    // Build provider clients
    let payments = Arc::new(
        RazorpayClient::new(config.razorpay.clone(), config.provider_timeout())
            .context("building Razorpay client")?,
    );
    let shipping_provider = Arc::new(
        ShiprocketClient::new(config.shiprocket.clone(), config.provider_timeout())
            .context("building Shiprocket client")?,
    );

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let shipping = Arc::new(ShippingService::new(
        Arc::clone(&store),
        shipping_provider,
        ShipmentDefaults::from(&config.shiprocket),
    ));
    let effects = SideEffectOrchestrator::new(
        Arc::clone(&store),
        Arc::clone(&shipping),
        event_bus.clone(),
        config.effects_timeout(),
    );
    let settlement = Arc::new(SettlementService::new(
        store,
        payments,
        effects,
        event_bus.clone(),
        config.razorpay.clone(),
        config.currency_exponent,
    ));
    let _audit = spawn_audit_logger(&event_bus);

    // Build application state
    let app_state = AppState {
        settlement,
        shipping,
        rate_limiter: Arc::new(RateLimiter::new(
            config.rate_limit_max_requests,
            config.rate_limit_window(),
        )),
        event_bus,
    };

    let app = api::app(app_state, config.request_timeout());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutting down");
    })
    .await?;

    Ok(())
}
