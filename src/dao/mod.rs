/// Round catalog loading.
pub mod catalog;
/// Durable snapshot and bus message layouts.
pub mod models;
/// Durable snapshot slot backends.
pub mod snapshot_store;
/// Storage error types.
pub mod storage;
