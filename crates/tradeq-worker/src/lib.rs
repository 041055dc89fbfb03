//! # Tradeq Worker
//!
//! Wires the Redis queue to the Postgres sink and drives the consumer
//! until a shutdown signal arrives.

pub mod app;
pub mod startup;

pub use app::{connect_redis, Worker};
