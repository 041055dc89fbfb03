//! Redis-backed queue transport.

mod queue;

pub use queue::RedisQueue;

use crate::error::{QueueError, QueueResult};
use deadpool_redis::{Config, Pool, Runtime};
use tracing::info;
use tradeq_config::{QueueConfig, RedisConfig};

/// Create a Redis connection pool and check it with `PING`.
pub async fn create_pool(config: &RedisConfig) -> QueueResult<Pool> {
    info!("Creating Redis connection pool for trade queue...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| QueueError::Configuration(format!("Invalid Redis config: {e}")))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| QueueError::Configuration(format!("Failed to create pool: {e}")))?;

    let mut conn = pool.get().await?;
    redis::cmd("PING").query_async::<String>(&mut *conn).await?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Names of the three Redis lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    /// Ready list.
    pub ready: String,
    /// In-flight list owned by this worker.
    pub in_flight: String,
    /// Dead-letter list.
    pub dead_letter: String,
}

impl QueueKeys {
    /// Create key names from explicit values.
    pub fn new(
        ready: impl Into<String>,
        in_flight: impl Into<String>,
        dead_letter: impl Into<String>,
    ) -> Self {
        Self {
            ready: ready.into(),
            in_flight: in_flight.into(),
            dead_letter: dead_letter.into(),
        }
    }
}

impl From<&QueueConfig> for QueueKeys {
    fn from(config: &QueueConfig) -> Self {
        Self::new(
            config.ready_key.clone(),
            config.in_flight_key(),
            config.dead_letter_key.clone(),
        )
    }
}

impl Default for QueueKeys {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let keys = QueueKeys::default();

        assert_eq!(keys.ready, "trades:queue");
        assert_eq!(keys.in_flight, "trades:processing");
        assert_eq!(keys.dead_letter, "trades:dlq");
    }

    #[test]
    fn test_keys_from_config_with_worker_name() {
        let config = QueueConfig {
            worker_name: Some("w2".to_string()),
            ..QueueConfig::default()
        };

        assert_eq!(QueueKeys::from(&config).in_flight, "trades:processing:w2");
    }
}
