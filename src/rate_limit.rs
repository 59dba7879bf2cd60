//! Per-client fixed-window rate limiting.
//!
//! State lives in process memory, so each instance enforces its own
//! limit. The middleware runs before extractors touch the body, so a
//! rejected request never reaches signature verification.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Number of tracked clients above which expired windows are pruned.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Allows `max_requests` per `window` for each client.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request from `client` now.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RateLimited`] once the client has used up
    /// its window.
    pub async fn check(&self, client: &str) -> Result<(), GatewayError> {
        self.check_at(client, Instant::now()).await
    }

    /// Counts a request from `client` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RateLimited`] once the client has used up
    /// its window.
    pub async fn check_at(&self, client: &str, now: Instant) -> Result<(), GatewayError> {
        let mut windows = self.windows.lock().await;
        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let entry = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.saturating_duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            let remaining = self
                .window
                .saturating_sub(now.saturating_duration_since(entry.started));
            return Err(GatewayError::RateLimited {
                retry_after_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            });
        }
        entry.count += 1;
        Ok(())
    }
}

/// Derives the rate-limit key for a request.
///
/// Prefers the first `x-forwarded-for` hop, then `x-real-ip`, then the
/// socket peer address.
///
/// Both headers are client-controlled. The key only identifies a client
/// when the gateway sits behind a proxy that overwrites them; exposed
/// directly, a caller can rotate `x-forwarded-for` to dodge the limit.
#[must_use]
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware enforcing the shared [`RateLimiter`].
///
/// # Errors
///
/// Returns [`GatewayError::RateLimited`] when the client is over its limit.
pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);
    if let Err(err) = state.rate_limiter.check(&client).await {
        tracing::warn!(%client, path = %request.uri().path(), "rate limit exceeded");
        return Err(err);
    }
    Ok(next.run(request).await)
}
