//! Library crate for klash-sync: replicated game-show state, its round-scoring
//! reducer, and the storage, bus and HTTP adapters that keep replicas in step.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
