//! Common test infrastructure for Redis integration tests.

use deadpool_redis::Pool;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;
use tradeq_config::RedisConfig;
use tradeq_queue::{create_pool, QueueKeys, RedisQueue};

/// Redis container wrapper.
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    pool: Pool,
}

impl TestRedis {
    /// Starts a fresh Redis container and connects a pool to it.
    pub async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            url: format!("redis://127.0.0.1:{port}/0"),
            pool_size: 4,
        };

        let pool = Self::connect_with_retry(&config, 30).await;

        Self {
            _container: container,
            pool,
        }
    }

    /// Returns a queue over fresh list names.
    pub fn queue(&self, keys: QueueKeys) -> RedisQueue {
        RedisQueue::new(self.pool.clone(), keys)
    }

    /// Returns a raw connection for seeding lists directly.
    pub async fn conn(&self) -> deadpool_redis::Connection {
        self.pool.get().await.expect("Failed to get Redis connection")
    }

    async fn connect_with_retry(config: &RedisConfig, max_attempts: u32) -> Pool {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match create_pool(config).await {
                Ok(pool) => return pool,
                Err(e) => {
                    if attempts >= max_attempts {
                        panic!("Failed to connect to Redis after {max_attempts} attempts: {e}");
                    }
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// Keys used by the tests.
pub fn test_keys() -> QueueKeys {
    QueueKeys::new("test:queue", "test:processing", "test:dlq")
}
