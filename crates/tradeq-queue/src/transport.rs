//! Queue transport abstraction.

use crate::envelope::{DeadLetterRecord, Envelope};
use crate::error::QueueResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Lengths of the three queue collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepths {
    /// Items waiting to be reserved.
    pub ready: u64,
    /// Items reserved but not yet acknowledged.
    pub in_flight: u64,
    /// Dead-letter records.
    pub dead_letter: u64,
}

/// Durable at-least-once channel over three named lists: ready, in-flight
/// and dead-letter.
///
/// Every method is one atomic operation against the store. The reservation
/// token returned by [`reserve`](Self::reserve) is the exact serialized
/// content and is what [`ack`](Self::ack) removes.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Appends an envelope to the tail of ready.
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()>;

    /// Moves the oldest ready item into in-flight and returns its token.
    ///
    /// Blocks up to `timeout`; `None` means no work arrived.
    async fn reserve(&self, timeout: Duration) -> QueueResult<Option<String>>;

    /// Removes one occurrence of `token` from in-flight.
    ///
    /// Returns false if the token was not present.
    async fn ack(&self, token: &str) -> QueueResult<bool>;

    /// Appends a record to dead-letter. The caller still acks the token.
    async fn dead_letter(&self, record: &DeadLetterRecord) -> QueueResult<()>;

    /// Moves the newest in-flight item to the head of ready.
    ///
    /// Repeating this until it returns false drains in-flight so that the
    /// oldest stranded item is served first.
    async fn requeue_one_in_flight(&self) -> QueueResult<bool>;

    /// Returns up to `limit` raw ready items, newest first.
    async fn peek_ready(&self, limit: usize) -> QueueResult<Vec<String>>;

    /// Returns up to `limit` raw dead-letter items, newest first.
    async fn peek_dead_letter(&self, limit: usize) -> QueueResult<Vec<String>>;

    /// Returns the length of each collection.
    async fn depths(&self) -> QueueResult<QueueDepths>;
}

#[async_trait]
impl<T: QueueTransport + ?Sized> QueueTransport for Arc<T> {
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()> {
        (**self).enqueue(envelope).await
    }

    async fn reserve(&self, timeout: Duration) -> QueueResult<Option<String>> {
        (**self).reserve(timeout).await
    }

    async fn ack(&self, token: &str) -> QueueResult<bool> {
        (**self).ack(token).await
    }

    async fn dead_letter(&self, record: &DeadLetterRecord) -> QueueResult<()> {
        (**self).dead_letter(record).await
    }

    async fn requeue_one_in_flight(&self) -> QueueResult<bool> {
        (**self).requeue_one_in_flight().await
    }

    async fn peek_ready(&self, limit: usize) -> QueueResult<Vec<String>> {
        (**self).peek_ready(limit).await
    }

    async fn peek_dead_letter(&self, limit: usize) -> QueueResult<Vec<String>> {
        (**self).peek_dead_letter(limit).await
    }

    async fn depths(&self) -> QueueResult<QueueDepths> {
        (**self).depths().await
    }
}
