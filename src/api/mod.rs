//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; the webhook receiver
//! and health check live at the root. Payment routes (webhook included)
//! sit behind the per-client rate limiter.

pub mod dto;
pub mod handlers;
pub mod openapi;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::rate_limit;

/// Builds the complete API router with all REST endpoints.
///
/// The rate-limit middleware captures `state`, so the returned router
/// still needs `.with_state(state)`.
pub fn build_router(state: &AppState) -> Router<AppState> {
    let limited = Router::new()
        .merge(handlers::webhook::routes())
        .nest("/api/v1", handlers::payment::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ));

    let router = Router::new()
        .merge(limited)
        .nest("/api/v1", handlers::shipping::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
}

/// Builds the served application: routes, HTTP tracing, permissive CORS
/// and a whole-request timeout.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    build_router(&state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
