use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Role of this replica ("host" or "display").
    pub role: String,
    /// Origin identifier stamped on this replica's snapshots.
    pub origin: Uuid,
}

impl HealthResponse {
    /// Storage reachable, replication fully operational.
    pub fn ok(role: impl Into<String>, origin: Uuid) -> Self {
        Self {
            status: "ok".to_string(),
            role: role.into(),
            origin,
        }
    }

    /// Storage unreachable; replication continues over the bus only.
    pub fn degraded(role: impl Into<String>, origin: Uuid) -> Self {
        Self {
            status: "degraded".to_string(),
            role: role.into(),
            origin,
        }
    }
}
