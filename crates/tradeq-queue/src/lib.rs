//! # Tradeq Queue
//!
//! Reliable consumption of trade events from Redis lists.
//!
//! ## Architecture
//!
//! ```text
//!  producer ──LPUSH──► ready ──BLMOVE──► in-flight ──LREM──► (acked)
//!                        ▲                  │
//!                        │  retry (LPUSH)   │ apply failed
//!                        └──────────────────┤
//!                        ▲                  │ attempts exhausted / invalid
//!                        │ recovery (LMOVE) ▼
//!                        └───────────── dead-letter
//! ```
//!
//! - [`QueueTransport`] is the atomic list primitive set; [`RedisQueue`] is
//!   the production implementation and [`MemoryQueue`] mirrors it in memory.
//! - [`recover_in_flight`] runs once at startup and returns stranded work to
//!   the head of ready.
//! - [`Consumer`] reserves one item at a time and resolves it as committed,
//!   retrying or dead-lettered.
//! - [`QueueInspector`] and [`TradeProducer`] are the read and write sides
//!   exposed to the rest of the system.
//!
//! Delivery is at-least-once. Sinks must be idempotent per `trade_id`.

pub mod consumer;
pub mod envelope;
pub mod error;
pub mod inspect;
pub mod memory;
pub mod metrics;
pub mod producer;
pub mod recovery;
pub mod redis;
pub mod transport;

pub use consumer::{Consumer, ConsumerSettings, ConsumerStats, Outcome};
pub use envelope::{DeadLetterRecord, Envelope, EnvelopeMeta, ParseError, INVALID_PAYLOAD};
pub use error::{QueueError, QueueResult};
pub use inspect::{PeekedItem, QueueInspector, INVALID_JSON};
pub use memory::MemoryQueue;
pub use metrics::{register_metrics, QueueMetrics};
pub use producer::TradeProducer;
pub use recovery::recover_in_flight;
pub use self::redis::{create_pool, QueueKeys, RedisQueue};
pub use transport::{QueueDepths, QueueTransport};
