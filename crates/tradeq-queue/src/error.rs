//! Queue error types.

use thiserror::Error;
use tradeq_core::TradeqError;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue-related errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Transport unreachable for a reason other than a Redis error.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rejected by validation before reaching the queue.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl QueueError {
    /// Returns true if this error means the transport could not be reached.
    ///
    /// The consumption loop pauses and reserves again on these.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Redis(err) => {
                err.is_io_error()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
                    || err.is_timeout()
                    || err.is_cluster_error()
                    || matches!(err.kind(), redis::ErrorKind::TryAgain | redis::ErrorKind::BusyLoadingError)
            }
            Self::Pool(_) | Self::Unavailable(_) => true,
            Self::Serialization(_) | Self::Configuration(_) | Self::Validation(_) => false,
        }
    }
}

impl From<QueueError> for TradeqError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Validation(msg) => Self::Validation(msg),
            QueueError::Configuration(msg) => Self::Configuration(msg),
            other => Self::Queue(other.to_string()),
        }
    }
}
