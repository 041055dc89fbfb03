//! Integration tests for `PgTradeRepository`.
//!
//! These tests run against a real Postgres database using testcontainers.
//! Requires Docker; run with `cargo test -- --ignored`.

mod common;

use common::TestDatabase;
use std::sync::Arc;
use std::time::Duration;
use tradeq_core::{Trade, TradeSink};
use tradeq_queue::{Consumer, ConsumerSettings, MemoryQueue, Outcome, TradeProducer};
use tradeq_repository::{PgTradeRepository, TradeQuery, TradeRepository};

async fn row_count(db: &TestDatabase) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trades_raw")
        .fetch_one(db.pool().inner())
        .await
        .expect("Count failed")
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_apply_twice_equals_once() {
    let db = TestDatabase::new().await;
    let repo = PgTradeRepository::new(db.pool());
    let trade = Trade::new("t1", "alice", "BTC", 42_000.0);

    repo.apply(&trade).await.expect("First apply failed");
    let first = repo.find_by_trade_id("t1").await.unwrap().unwrap();
    repo.apply(&trade).await.expect("Second apply failed");
    let second = repo.find_by_trade_id("t1").await.unwrap().unwrap();

    assert_eq!(row_count(&db).await, 1);
    assert_eq!(first.updated_at, second.updated_at);
    assert_eq!(first, second);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_last_write_wins() {
    let db = TestDatabase::new().await;
    let repo = PgTradeRepository::new(db.pool());

    repo.apply(&Trade::new("t1", "alice", "BTC", 1.0)).await.unwrap();
    repo.apply(&Trade::new("t1", "bob", "ETH", 2.0)).await.unwrap();

    let row = repo.find_by_trade_id("t1").await.unwrap().unwrap();
    assert_eq!(row.user_id, "bob");
    assert_eq!(row.symbol, "ETH");
    assert_eq!(row.price, 2.0);
    assert!(row.updated_at >= row.created_at);
    assert_eq!(row_count(&db).await, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_missing_trade() {
    let db = TestDatabase::new().await;
    let repo = PgTradeRepository::new(db.pool());

    assert!(repo.find_by_trade_id("missing").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_filters_and_limits() {
    let db = TestDatabase::new().await;
    let repo = PgTradeRepository::new(db.pool());

    repo.apply(&Trade::new("t1", "alice", "BTC", 1.0)).await.unwrap();
    repo.apply(&Trade::new("t2", "alice", "ETH", 2.0)).await.unwrap();
    repo.apply(&Trade::new("t3", "bob", "BTC", 3.0)).await.unwrap();

    let btc = repo
        .list(&TradeQuery {
            symbol: Some("BTC".to_string()),
            ..TradeQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(btc.len(), 2);
    assert!(btc.iter().all(|row| row.symbol == "BTC"));

    let alice_btc = repo
        .list(&TradeQuery {
            symbol: Some("BTC".to_string()),
            user_id: Some("alice".to_string()),
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(alice_btc.len(), 1);
    assert_eq!(alice_btc[0].trade_id, "t1");

    let limited = repo
        .list(&TradeQuery {
            limit: Some(2),
            ..TradeQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert!(limited[0].created_at >= limited[1].created_at);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_enqueue_to_lookup() {
    let db = TestDatabase::new().await;
    let repo = Arc::new(PgTradeRepository::new(db.pool()));
    let queue = Arc::new(MemoryQueue::new());
    let producer = TradeProducer::new(queue.clone());
    let consumer = Consumer::new(
        queue.clone(),
        repo.clone(),
        ConsumerSettings {
            reserve_timeout: Duration::from_millis(10),
            ..ConsumerSettings::default()
        },
    );

    let accepted = producer
        .submit(Trade::new("abc", "alice", "ETH", 2000.5))
        .await
        .unwrap();
    let outcome = consumer.process_next().await.unwrap();

    assert_eq!(accepted, "abc");
    assert_eq!(
        outcome,
        Outcome::Committed {
            trade_id: "abc".to_string()
        }
    );

    let row = repo.find_by_trade_id("abc").await.unwrap().unwrap();
    assert_eq!(row.user_id, "alice");
    assert_eq!(row.symbol, "ETH");
    assert_eq!(row.price, 2000.5);
    assert!(queue.in_flight_items().is_empty());
}
