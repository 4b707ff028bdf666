use tracing::warn;

use crate::{
    dto::health::HealthResponse,
    state::{Role, SharedState},
};

/// Report whether the durable slot is usable, probing it when one is configured.
pub async fn health_status(replica: &SharedState) -> HealthResponse {
    let role = match replica.role() {
        Role::Host => "host",
        Role::Display => "display",
    };

    let healthy = match replica.store() {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = store.key(), error = %err, "storage health check failed");
                false
            }
        },
        None => {
            warn!("no snapshot storage configured (degraded mode)");
            false
        }
    };

    if healthy {
        HealthResponse::ok(role, replica.origin())
    } else {
        HealthResponse::degraded(role, replica.origin())
    }
}
