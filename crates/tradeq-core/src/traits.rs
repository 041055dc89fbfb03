//! Core traits shared across the pipeline.

use crate::{Trade, TradeqResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence step applied to every delivered trade.
///
/// Implementations must be idempotent per `trade_id`: applying the same
/// trade twice leaves the store exactly as applying it once. Each call is
/// one transaction; on error nothing from that call is visible.
#[async_trait]
pub trait TradeSink: Send + Sync {
    /// Inserts or updates the trade keyed by its `trade_id`.
    async fn apply(&self, trade: &Trade) -> TradeqResult<()>;
}

#[async_trait]
impl<T: TradeSink + ?Sized> TradeSink for Arc<T> {
    async fn apply(&self, trade: &Trade) -> TradeqResult<()> {
        (**self).apply(trade).await
    }
}

/// Trait for health checks.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Returns the name of this health check.
    fn name(&self) -> &str;

    /// Performs the health check.
    async fn check(&self) -> HealthStatus;
}

/// Health check status.
#[derive(Debug, Clone)]
pub enum HealthStatus {
    /// The component is healthy.
    Healthy,
    /// The component is unhealthy.
    Unhealthy(String),
}

impl HealthStatus {
    /// Returns true if the status is healthy.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}
