//! Redis list queue implementation.
//!
//! Ready and dead-letter lists are pushed on the left; reservations pop the
//! right end of ready so the list behaves as a FIFO.

use super::QueueKeys;
use crate::envelope::{DeadLetterRecord, Envelope};
use crate::error::QueueResult;
use crate::transport::{QueueDepths, QueueTransport};
use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};
use tradeq_core::{HealthCheck, HealthStatus};

/// Redis-backed trade queue.
pub struct RedisQueue {
    pool: Pool,
    keys: QueueKeys,
}

impl RedisQueue {
    /// Create a new Redis queue.
    pub fn new(pool: Pool, keys: QueueKeys) -> Self {
        Self { pool, keys }
    }

    /// Returns the list names in use.
    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> QueueResult<deadpool_redis::Connection> {
        Ok(self.pool.get().await?)
    }

    async fn peek(&self, key: &str, limit: usize) -> QueueResult<Vec<String>> {
        // LRANGE 0 -1 would return the whole list.
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let mut conn = self.conn().await?;
        let items: Vec<String> = conn.lrange(key, 0, stop).await?;
        Ok(items)
    }
}

#[async_trait]
impl QueueTransport for RedisQueue {
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()> {
        let json = envelope.to_json()?;
        let mut conn = self.conn().await?;
        let _: i64 = conn.lpush(&self.keys.ready, json).await?;

        debug!(
            trade_id = %envelope.trade_id(),
            attempt = envelope.meta.attempt,
            key = %self.keys.ready,
            "Enqueued trade"
        );
        Ok(())
    }

    async fn reserve(&self, timeout: Duration) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        let token: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.keys.ready)
            .arg(&self.keys.in_flight)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut *conn)
            .await?;
        Ok(token)
    }

    async fn ack(&self, token: &str) -> QueueResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.lrem(&self.keys.in_flight, 1, token).await?;
        if removed == 0 {
            warn!(key = %self.keys.in_flight, "Ack found no matching in-flight item");
        }
        Ok(removed > 0)
    }

    async fn dead_letter(&self, record: &DeadLetterRecord) -> QueueResult<()> {
        let json = record.to_json()?;
        let mut conn = self.conn().await?;
        let _: i64 = conn.lpush(&self.keys.dead_letter, json).await?;

        debug!(reason = %record.reason, key = %self.keys.dead_letter, "Dead-lettered item");
        Ok(())
    }

    async fn requeue_one_in_flight(&self) -> QueueResult<bool> {
        let mut conn = self.conn().await?;
        let moved: Option<String> = redis::cmd("LMOVE")
            .arg(&self.keys.in_flight)
            .arg(&self.keys.ready)
            .arg("LEFT")
            .arg("RIGHT")
            .query_async(&mut *conn)
            .await?;
        Ok(moved.is_some())
    }

    async fn peek_ready(&self, limit: usize) -> QueueResult<Vec<String>> {
        self.peek(&self.keys.ready, limit).await
    }

    async fn peek_dead_letter(&self, limit: usize) -> QueueResult<Vec<String>> {
        self.peek(&self.keys.dead_letter, limit).await
    }

    async fn depths(&self) -> QueueResult<QueueDepths> {
        let mut conn = self.conn().await?;
        let (ready, in_flight, dead_letter): (u64, u64, u64) = redis::pipe()
            .llen(&self.keys.ready)
            .llen(&self.keys.in_flight)
            .llen(&self.keys.dead_letter)
            .query_async(&mut *conn)
            .await?;

        Ok(QueueDepths {
            ready,
            in_flight,
            dead_letter,
        })
    }
}

#[async_trait]
impl HealthCheck for RedisQueue {
    fn name(&self) -> &str {
        "redis"
    }

    async fn check(&self) -> HealthStatus {
        let result: QueueResult<String> = async {
            let mut conn = self.conn().await?;
            Ok(redis::cmd("PING").query_async(&mut *conn).await?)
        }
        .await;

        match result {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }
}
