//! Library half of the ingest boundary.

use crate::envelope::Envelope;
use crate::error::{QueueError, QueueResult};
use crate::metrics::QueueMetrics;
use crate::transport::QueueTransport;
use tracing::debug;
use tradeq_core::{Trade, TradeqError};

/// Validates trades and appends them to the ready list.
pub struct TradeProducer<T> {
    transport: T,
}

impl<T: QueueTransport> TradeProducer<T> {
    /// Create a new producer.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Validates and enqueues a trade, returning its accepted `trade_id`.
    ///
    /// There is no deduplication here; the sink is idempotent per id.
    pub async fn submit(&self, trade: Trade) -> QueueResult<String> {
        trade.ensure_valid().map_err(|e| match e {
            TradeqError::Validation(msg) => QueueError::Validation(msg),
            other => QueueError::Validation(other.to_string()),
        })?;

        let envelope = Envelope::new(trade);
        self.transport.enqueue(&envelope).await?;
        QueueMetrics::trade_enqueued();

        debug!(trade_id = %envelope.trade_id(), "Accepted trade");
        Ok(envelope.trade.trade_id)
    }
}
