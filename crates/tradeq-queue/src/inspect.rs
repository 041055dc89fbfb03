//! Read-only views into the ready and dead-letter lists.

use crate::error::QueueResult;
use crate::transport::{QueueDepths, QueueTransport};
use serde::Serialize;

/// Error label for entries that are not JSON.
pub const INVALID_JSON: &str = "invalid_json";

/// One entry returned by a peek.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PeekedItem {
    /// The decoded JSON content.
    Parsed(serde_json::Value),
    /// Content that is not JSON, returned verbatim.
    Invalid { raw: String, error: &'static str },
}

impl PeekedItem {
    fn decode(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => Self::Parsed(value),
            Err(_) => Self::Invalid {
                raw,
                error: INVALID_JSON,
            },
        }
    }
}

/// Bounded, newest-first inspection of queue contents.
pub struct QueueInspector<T> {
    transport: T,
    max_peek_limit: usize,
}

impl<T: QueueTransport> QueueInspector<T> {
    /// Create an inspector; peeks are clamped to `max_peek_limit`.
    pub fn new(transport: T, max_peek_limit: usize) -> Self {
        Self {
            transport,
            max_peek_limit,
        }
    }

    /// Clamps a requested limit to the configured maximum.
    pub fn clamp_limit(&self, limit: usize) -> usize {
        limit.min(self.max_peek_limit)
    }

    /// Returns up to `limit` ready items, newest first.
    pub async fn peek_ready(&self, limit: usize) -> QueueResult<Vec<PeekedItem>> {
        let raw = self.transport.peek_ready(self.clamp_limit(limit)).await?;
        Ok(raw.into_iter().map(PeekedItem::decode).collect())
    }

    /// Returns up to `limit` dead-letter records, newest first.
    pub async fn peek_dead_letter(&self, limit: usize) -> QueueResult<Vec<PeekedItem>> {
        let raw = self
            .transport
            .peek_dead_letter(self.clamp_limit(limit))
            .await?;
        Ok(raw.into_iter().map(PeekedItem::decode).collect())
    }

    /// Returns the current length of each list.
    pub async fn depths(&self) -> QueueResult<QueueDepths> {
        self.transport.depths().await
    }
}
