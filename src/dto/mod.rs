pub mod action;
pub mod catalog;
pub mod health;
pub mod sse;
