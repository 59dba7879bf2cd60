//! Audit logger: writes every settlement event to the log.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::EventBus;

/// Subscribes to `event_bus` and logs each event as structured JSON until
/// the bus is dropped.
pub fn spawn_audit_logger(event_bus: &EventBus) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    tracing::info!(
                        target: "settlement::audit",
                        event_type = event.event_type_str(),
                        order_id = ?event.order_id(),
                        %payload,
                        "settlement event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "audit logger lagged behind event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("audit logger stopped");
    })
}
