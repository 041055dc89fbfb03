//! Worker assembly: connections, recovery and the consumption loop.

use deadpool_redis::Pool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tradeq_config::{AppConfig, RedisConfig, WorkerConfig};
use tradeq_core::{HealthCheck, TradeqResult};
use tradeq_queue::{
    create_pool, recover_in_flight, Consumer, ConsumerSettings, ConsumerStats, QueueKeys,
    RedisQueue,
};
use tradeq_repository::{DatabasePool, PgTradeRepository};

/// A fully connected worker, ready to run.
pub struct Worker {
    queue: Arc<RedisQueue>,
    db_pool: Arc<DatabasePool>,
    consumer: Consumer<Arc<RedisQueue>, Arc<PgTradeRepository>>,
}

impl Worker {
    /// Connects to Redis and Postgres, retrying while either is starting,
    /// and runs migrations when enabled.
    pub async fn connect(config: &AppConfig) -> TradeqResult<Self> {
        let redis_pool = connect_redis(&config.redis, &config.worker).await?;
        let queue = Arc::new(RedisQueue::new(redis_pool, QueueKeys::from(&config.queue)));

        let db_pool = DatabasePool::connect_with_retry(
            &config.database,
            config.worker.connect_attempts,
            config.worker.connect_retry_interval(),
        )
        .await?;
        if config.database.run_migrations {
            db_pool.run_migrations().await?;
        }
        let db_pool = Arc::new(db_pool);

        let repository = Arc::new(PgTradeRepository::new(db_pool.clone()));
        let consumer = Consumer::new(
            queue.clone(),
            repository,
            ConsumerSettings::from(&config.worker),
        );

        let checks: [&dyn HealthCheck; 2] = [&*queue, &*db_pool];
        for check in checks {
            let status = check.check().await;
            info!(component = check.name(), healthy = status.is_healthy(), "Health check");
        }

        Ok(Self {
            queue,
            db_pool,
            consumer,
        })
    }

    /// Recovers stranded in-flight work, then consumes until shutdown.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> TradeqResult<ConsumerStats> {
        let recovered = recover_in_flight(self.queue.as_ref()).await?;
        info!(
            recovered,
            ready_key = %self.queue.keys().ready,
            in_flight_key = %self.queue.keys().in_flight,
            "Worker started"
        );

        let stats = self.consumer.run(shutdown).await;

        self.db_pool.close().await;
        Ok(stats)
    }
}

/// Creates the Redis pool, retrying up to `connect_attempts` times.
pub async fn connect_redis(redis: &RedisConfig, worker: &WorkerConfig) -> TradeqResult<Pool> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match create_pool(redis).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt >= worker.connect_attempts => return Err(e.into()),
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = worker.connect_attempts,
                    error = %e,
                    "Redis not ready, retrying"
                );
                tokio::time::sleep(worker.connect_retry_interval()).await;
            }
        }
    }
}
