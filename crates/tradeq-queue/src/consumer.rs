//! The consumption loop.
//!
//! One reservation at a time: reserve, parse, apply, then resolve as
//! committed, retrying or dead-lettered. Shutdown is only observed between
//! iterations so a reservation is always resolved once started.

use crate::envelope::{DeadLetterRecord, Envelope, ParseError, INVALID_PAYLOAD};
use crate::error::QueueResult;
use crate::metrics::QueueMetrics;
use crate::transport::QueueTransport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, info, warn};
use tradeq_config::WorkerConfig;
use tradeq_core::{TradeSink, TradeqError};

/// Timing and retry settings for the loop.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// How long a reservation blocks.
    pub reserve_timeout: Duration,
    /// Pause after an empty reservation.
    pub idle_sleep: Duration,
    /// Attempts after which a failing trade is dead-lettered.
    pub max_attempts: u32,
    /// Pause after scheduling a retry.
    pub retry_backoff: Duration,
    /// Pause after a transport error.
    pub transport_error_pause: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for ConsumerSettings {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            reserve_timeout: config.reserve_timeout(),
            idle_sleep: config.idle_sleep(),
            max_attempts: config.max_attempts,
            retry_backoff: config.retry_backoff(),
            transport_error_pause: config.transport_error_pause(),
        }
    }
}

/// How one iteration of the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No work arrived before the reservation timed out.
    Idle,
    /// Applied and acknowledged.
    Committed { trade_id: String },
    /// Failed and re-enqueued with the given attempt count.
    Retrying { trade_id: String, attempt: u32 },
    /// Recorded in dead-letter and acknowledged.
    DeadLettered {
        trade_id: Option<String>,
        reason: String,
    },
}

/// Totals since the consumer was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Trades committed.
    pub committed: u64,
    /// Retries scheduled.
    pub retried: u64,
    /// Items dead-lettered.
    pub dead_lettered: u64,
    /// Iterations that ended in an error.
    pub errors: u64,
}

/// Sequential consumer over a queue transport and a sink.
pub struct Consumer<T, S> {
    transport: T,
    sink: S,
    settings: ConsumerSettings,
    committed: AtomicU64,
    retried: AtomicU64,
    dead_lettered: AtomicU64,
    errors: AtomicU64,
}

impl<T: QueueTransport, S: TradeSink> Consumer<T, S> {
    /// Create a new consumer.
    pub fn new(transport: T, sink: S, settings: ConsumerSettings) -> Self {
        Self {
            transport,
            sink,
            settings,
            committed: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the totals so far.
    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            committed: self.committed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    /// Reserves and resolves at most one item.
    ///
    /// Does not sleep; [`run`](Self::run) applies the idle, backoff and error
    /// pauses. A transport error after the reservation leaves the item in
    /// in-flight for the next recovery sweep.
    pub async fn process_next(&self) -> QueueResult<Outcome> {
        let Some(token) = self.transport.reserve(self.settings.reserve_timeout).await? else {
            return Ok(Outcome::Idle);
        };
        QueueMetrics::trade_reserved();

        let envelope = match Envelope::parse(&token) {
            Ok(envelope) => envelope,
            Err(err) => return self.reject(&token, &err).await,
        };

        let started = Instant::now();
        match self.sink.apply(&envelope.trade).await {
            Ok(()) => {
                self.transport.ack(&token).await?;
                self.committed.fetch_add(1, Ordering::Relaxed);
                QueueMetrics::trade_committed(started.elapsed());

                debug!(
                    trade_id = %envelope.trade_id(),
                    attempt = envelope.meta.attempt,
                    "Committed trade"
                );
                Ok(Outcome::Committed {
                    trade_id: envelope.trade.trade_id,
                })
            }
            Err(err) => self.fail(&token, &envelope, &err, started.elapsed()).await,
        }
    }

    /// Dead-letters content that is not a usable envelope. Never retried.
    async fn reject(&self, token: &str, err: &ParseError) -> QueueResult<Outcome> {
        warn!(error = %err, "Invalid payload, sending to dead-letter");

        self.transport
            .dead_letter(&DeadLetterRecord::for_raw(token))
            .await?;
        self.transport.ack(token).await?;

        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
        QueueMetrics::trade_dead_lettered(INVALID_PAYLOAD);

        Ok(Outcome::DeadLettered {
            trade_id: None,
            reason: INVALID_PAYLOAD.to_string(),
        })
    }

    /// Resolves a failed apply as a retry or, once attempts run out, a
    /// dead-letter.
    async fn fail(
        &self,
        token: &str,
        envelope: &Envelope,
        err: &TradeqError,
        elapsed: Duration,
    ) -> QueueResult<Outcome> {
        let next = envelope.next_attempt();
        let attempt = next.meta.attempt;
        let trade_id = next.trade_id().to_string();
        let reason = err.to_string();

        if attempt >= self.settings.max_attempts {
            error!(
                trade_id = %trade_id,
                attempt,
                error = %reason,
                "Trade failed permanently, sending to dead-letter"
            );

            let record = DeadLetterRecord::for_envelope(&next, reason.clone())?;
            self.transport.dead_letter(&record).await?;
            self.transport.ack(token).await?;

            self.dead_lettered.fetch_add(1, Ordering::Relaxed);
            QueueMetrics::trade_dead_lettered("max_attempts");

            return Ok(Outcome::DeadLettered {
                trade_id: Some(trade_id),
                reason,
            });
        }

        warn!(
            trade_id = %trade_id,
            attempt,
            error = %reason,
            "Trade failed, scheduling retry"
        );

        // Enqueue before ack: a crash in between duplicates the trade rather
        // than losing it, and the sink absorbs duplicates.
        self.transport.enqueue(&next).await?;
        self.transport.ack(token).await?;

        self.retried.fetch_add(1, Ordering::Relaxed);
        QueueMetrics::trade_retried(attempt, elapsed);

        Ok(Outcome::Retrying { trade_id, attempt })
    }

    /// Runs until a shutdown signal arrives or the sender is dropped.
    ///
    /// Transport errors never stop the loop; it pauses and reserves again.
    /// Depth gauges are refreshed whenever a reservation comes back empty.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> ConsumerStats {
        info!(
            max_attempts = self.settings.max_attempts,
            reserve_timeout_secs = self.settings.reserve_timeout.as_secs_f64(),
            "Consumer started"
        );

        loop {
            if shutdown_requested(&mut shutdown) {
                info!("Received shutdown signal");
                break;
            }

            let pause = match self.process_next().await {
                Ok(Outcome::Idle) => {
                    QueueMetrics::refresh_depths(&self.transport).await;
                    self.settings.idle_sleep
                }
                Ok(Outcome::Retrying { .. }) => self.settings.retry_backoff,
                Ok(Outcome::Committed { .. } | Outcome::DeadLettered { .. }) => Duration::ZERO,
                Err(e) => {
                    self.errors.fetch_add(1, Ordering::Relaxed);
                    if e.is_transport() {
                        QueueMetrics::transport_error();
                        warn!(error = %e, "Queue transport error, pausing");
                    } else {
                        error!(error = %e, "Unexpected consumer error, pausing");
                    }
                    self.settings.transport_error_pause
                }
            };

            if !pause.is_zero() {
                tokio::select! {
                    () = tokio::time::sleep(pause) => {}
                    _ = shutdown.recv() => {
                        info!("Received shutdown signal");
                        break;
                    }
                }
            }
        }

        let stats = self.stats();
        info!(
            committed = stats.committed,
            retried = stats.retried,
            dead_lettered = stats.dead_lettered,
            errors = stats.errors,
            "Consumer stopped"
        );
        stats
    }
}

/// A closed or lagged channel counts as a shutdown request.
fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown.try_recv(), Err(TryRecvError::Empty))
}
