//! Integration tests for `RedisQueue` and the consumer over real Redis lists.
//!
//! These tests start a Redis container with testcontainers and need Docker.
//! Run them with `cargo test -- --ignored`.

mod common;

use async_trait::async_trait;
use common::{test_keys, TestRedis};
use parking_lot::Mutex;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tradeq_core::{Trade, TradeSink, TradeqError, TradeqResult};
use tradeq_queue::{
    recover_in_flight, Consumer, ConsumerSettings, Envelope, Outcome, QueueDepths, QueueTransport,
    INVALID_PAYLOAD,
};

const TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Default)]
struct MapSink {
    rows: Mutex<HashMap<String, Trade>>,
    failing: Option<String>,
}

#[async_trait]
impl TradeSink for MapSink {
    async fn apply(&self, trade: &Trade) -> TradeqResult<()> {
        if self.failing.as_deref() == Some(trade.trade_id.as_str()) {
            return Err(TradeqError::database("store unavailable"));
        }
        self.rows.lock().insert(trade.trade_id.clone(), trade.clone());
        Ok(())
    }
}

fn settings() -> ConsumerSettings {
    ConsumerSettings {
        reserve_timeout: TIMEOUT,
        idle_sleep: Duration::from_millis(1),
        max_attempts: 3,
        retry_backoff: Duration::from_millis(1),
        transport_error_pause: Duration::from_millis(10),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reserve_moves_to_in_flight_and_ack_removes() {
    let redis = TestRedis::new().await;
    let queue = redis.queue(test_keys());

    let envelope = Envelope::new(Trade::new("t1", "u", "BTC", 1.0));
    queue.enqueue(&envelope).await.unwrap();

    let token = queue.reserve(TIMEOUT).await.unwrap().expect("no reservation");
    assert_eq!(Envelope::parse(&token).unwrap(), envelope);
    assert_eq!(
        queue.depths().await.unwrap(),
        QueueDepths {
            ready: 0,
            in_flight: 1,
            dead_letter: 0
        }
    );

    assert!(queue.ack(&token).await.unwrap());
    assert!(!queue.ack(&token).await.unwrap());
    assert_eq!(queue.depths().await.unwrap(), QueueDepths::default());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reserve_times_out_on_empty_list() {
    let redis = TestRedis::new().await;
    let queue = redis.queue(test_keys());

    assert!(queue.reserve(TIMEOUT).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_recovery_serves_stranded_work_first() {
    let redis = TestRedis::new().await;
    let keys = test_keys();
    let queue = redis.queue(keys.clone());

    let mut conn = redis.conn().await;
    let _: i64 = conn.lpush(&keys.ready, "fresh").await.unwrap();
    let _: i64 = conn.lpush(&keys.in_flight, "stranded-old").await.unwrap();
    let _: i64 = conn.lpush(&keys.in_flight, "stranded-new").await.unwrap();

    let recovered = recover_in_flight(&queue).await.unwrap();
    assert_eq!(recovered, 2);

    let order: Vec<Option<String>> = vec![
        queue.reserve(TIMEOUT).await.unwrap(),
        queue.reserve(TIMEOUT).await.unwrap(),
        queue.reserve(TIMEOUT).await.unwrap(),
    ];
    assert_eq!(
        order,
        vec![
            Some("stranded-old".to_string()),
            Some("stranded-new".to_string()),
            Some("fresh".to_string()),
        ]
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_peek_is_newest_first() {
    let redis = TestRedis::new().await;
    let queue = redis.queue(test_keys());

    for id in ["a", "b", "c"] {
        queue
            .enqueue(&Envelope::new(Trade::new(id, "u", "BTC", 1.0)))
            .await
            .unwrap();
    }

    let peeked = queue.peek_ready(2).await.unwrap();
    let ids: Vec<String> = peeked
        .iter()
        .map(|raw| Envelope::parse(raw).unwrap().trade.trade_id)
        .collect();
    assert_eq!(ids, vec!["c", "b"]);
    assert!(queue.peek_ready(0).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_consumer_over_redis() {
    let redis = TestRedis::new().await;
    let keys = test_keys();
    let queue = Arc::new(redis.queue(keys.clone()));
    let sink = Arc::new(MapSink {
        failing: Some("bad".to_string()),
        ..MapSink::default()
    });
    let consumer = Consumer::new(queue.clone(), sink.clone(), settings());

    queue
        .enqueue(&Envelope::new(Trade::new("abc", "alice", "ETH", 2000.5)))
        .await
        .unwrap();
    queue
        .enqueue(&Envelope::new(Trade::new("bad", "bob", "BTC", 1.0)))
        .await
        .unwrap();
    let mut conn = redis.conn().await;
    let _: i64 = conn.lpush(&keys.ready, "not-json").await.unwrap();

    loop {
        if consumer.process_next().await.unwrap() == Outcome::Idle {
            break;
        }
    }

    assert_eq!(sink.rows.lock().get("abc").unwrap().symbol, "ETH");
    let depths = queue.depths().await.unwrap();
    assert_eq!(depths.ready, 0);
    assert_eq!(depths.in_flight, 0);
    assert_eq!(depths.dead_letter, 2);

    let records = queue.peek_dead_letter(10).await.unwrap();
    let reasons: Vec<String> = records
        .iter()
        .map(|raw| {
            let value: serde_json::Value = serde_json::from_str(raw).unwrap();
            value["reason"].as_str().unwrap().to_string()
        })
        .collect();
    assert!(reasons.iter().any(|r| r == INVALID_PAYLOAD));
    assert!(reasons.iter().any(|r| r.contains("store unavailable")));
}
