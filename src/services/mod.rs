/// Host command decoding and dispatch.
pub mod action_service;
/// Round catalog listing.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Bus intake feeding remote snapshots into the replica.
pub mod intake;
/// Loopback relay joining the buses of separate processes.
pub mod relay;
/// Durable slot polling for replicas the bus cannot reach.
pub mod storage_watcher;
/// Server-Sent Events bridge for display renderers.
pub mod stream_service;
