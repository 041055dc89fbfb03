//! In-process queue transport.
//!
//! Mirrors the Redis list layout exactly (index 0 is the left end) so the
//! consumption loop can be exercised without a server.

use crate::envelope::{DeadLetterRecord, Envelope};
use crate::error::{QueueError, QueueResult};
use crate::transport::{QueueDepths, QueueTransport};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct Lists {
    ready: VecDeque<String>,
    in_flight: VecDeque<String>,
    dead_letter: VecDeque<String>,
}

/// Queue transport backed by in-memory lists.
#[derive(Default)]
pub struct MemoryQueue {
    lists: Mutex<Lists>,
    notify: Notify,
    failing_calls: AtomicU32,
}

impl MemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes raw content onto ready, as an external producer would.
    pub fn push_raw(&self, raw: impl Into<String>) {
        self.lists.lock().ready.push_front(raw.into());
        self.notify.notify_one();
    }

    /// Pushes raw content onto in-flight, as a crashed worker would leave it.
    pub fn push_in_flight(&self, raw: impl Into<String>) {
        self.lists.lock().in_flight.push_front(raw.into());
    }

    /// Makes the next `count` transport calls fail as if the server were down.
    pub fn fail_next(&self, count: u32) {
        self.failing_calls.store(count, Ordering::SeqCst);
    }

    /// Ready contents, left to right.
    #[must_use]
    pub fn ready_items(&self) -> Vec<String> {
        self.lists.lock().ready.iter().cloned().collect()
    }

    /// In-flight contents, left to right.
    #[must_use]
    pub fn in_flight_items(&self) -> Vec<String> {
        self.lists.lock().in_flight.iter().cloned().collect()
    }

    /// Dead-letter contents, left to right.
    #[must_use]
    pub fn dead_letter_items(&self) -> Vec<String> {
        self.lists.lock().dead_letter.iter().cloned().collect()
    }

    fn check_available(&self) -> QueueResult<()> {
        let failing = self
            .failing_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(QueueError::Unavailable("injected transport failure".to_string()));
        }
        Ok(())
    }

    fn try_reserve(&self) -> Option<String> {
        let mut lists = self.lists.lock();
        let token = lists.ready.pop_back()?;
        lists.in_flight.push_front(token.clone());
        Some(token)
    }
}

fn newest(list: &VecDeque<String>, limit: usize) -> Vec<String> {
    list.iter().take(limit).cloned().collect()
}

fn len(list: &VecDeque<String>) -> u64 {
    u64::try_from(list.len()).unwrap_or(u64::MAX)
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()> {
        self.check_available()?;
        let json = envelope.to_json()?;
        self.push_raw(json);
        Ok(())
    }

    async fn reserve(&self, timeout: Duration) -> QueueResult<Option<String>> {
        self.check_available()?;
        if let Some(token) = self.try_reserve() {
            return Ok(Some(token));
        }
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
        Ok(self.try_reserve())
    }

    async fn ack(&self, token: &str) -> QueueResult<bool> {
        self.check_available()?;
        let mut lists = self.lists.lock();
        match lists.in_flight.iter().position(|item| item == token) {
            Some(index) => {
                lists.in_flight.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn dead_letter(&self, record: &DeadLetterRecord) -> QueueResult<()> {
        self.check_available()?;
        let json = record.to_json()?;
        self.lists.lock().dead_letter.push_front(json);
        Ok(())
    }

    async fn requeue_one_in_flight(&self) -> QueueResult<bool> {
        self.check_available()?;
        let mut lists = self.lists.lock();
        match lists.in_flight.pop_front() {
            Some(item) => {
                lists.ready.push_back(item);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn peek_ready(&self, limit: usize) -> QueueResult<Vec<String>> {
        self.check_available()?;
        Ok(newest(&self.lists.lock().ready, limit))
    }

    async fn peek_dead_letter(&self, limit: usize) -> QueueResult<Vec<String>> {
        self.check_available()?;
        Ok(newest(&self.lists.lock().dead_letter, limit))
    }

    async fn depths(&self) -> QueueResult<QueueDepths> {
        self.check_available()?;
        let lists = self.lists.lock();
        Ok(QueueDepths {
            ready: len(&lists.ready),
            in_flight: len(&lists.in_flight),
            dead_letter: len(&lists.dead_letter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeq_core::Trade;

    const TICK: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_reserve_is_fifo() {
        let queue = MemoryQueue::new();
        queue.push_raw("a");
        queue.push_raw("b");

        assert_eq!(queue.reserve(TICK).await.unwrap().as_deref(), Some("a"));
        assert_eq!(queue.reserve(TICK).await.unwrap().as_deref(), Some("b"));
        assert_eq!(queue.in_flight_items(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_reserve_times_out_empty() {
        let queue = MemoryQueue::new();
        assert!(queue.reserve(TICK).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reserve_wakes_on_enqueue() {
        let queue = std::sync::Arc::new(MemoryQueue::new());
        let producer = queue.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(TICK).await;
            producer.push_raw("late");
        });

        let token = queue.reserve(Duration::from_secs(5)).await.unwrap();
        handle.await.unwrap();
        assert_eq!(token.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_ack_removes_one_occurrence() {
        let queue = MemoryQueue::new();
        queue.push_in_flight("dup");
        queue.push_in_flight("dup");

        assert!(queue.ack("dup").await.unwrap());
        assert_eq!(queue.in_flight_items(), vec!["dup"]);
        assert!(queue.ack("dup").await.unwrap());
        assert!(!queue.ack("dup").await.unwrap());
    }

    #[tokio::test]
    async fn test_enqueue_writes_envelope() {
        let queue = MemoryQueue::new();
        let envelope = Envelope::new(Trade::new("t1", "u", "BTC", 1.0));
        queue.enqueue(&envelope).await.unwrap();

        let ready = queue.ready_items();
        assert_eq!(ready.len(), 1);
        assert_eq!(Envelope::parse(&ready[0]).unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_requeue_serves_oldest_in_flight_first() {
        let queue = MemoryQueue::new();
        queue.push_raw("new");
        queue.push_in_flight("old");
        queue.push_in_flight("recent");

        while queue.requeue_one_in_flight().await.unwrap() {}

        assert!(queue.in_flight_items().is_empty());
        assert_eq!(queue.reserve(TICK).await.unwrap().as_deref(), Some("old"));
        assert_eq!(
            queue.reserve(TICK).await.unwrap().as_deref(),
            Some("recent")
        );
        assert_eq!(queue.reserve(TICK).await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_peek_newest_first() {
        let queue = MemoryQueue::new();
        for item in ["1", "2", "3"] {
            queue.push_raw(item);
        }

        assert_eq!(queue.peek_ready(2).await.unwrap(), vec!["3", "2"]);
        assert!(queue.peek_ready(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let queue = MemoryQueue::new();
        queue.fail_next(2);

        assert!(queue.reserve(TICK).await.unwrap_err().is_transport());
        assert!(queue.depths().await.is_err());
        assert_eq!(queue.depths().await.unwrap(), QueueDepths::default());
    }
}
