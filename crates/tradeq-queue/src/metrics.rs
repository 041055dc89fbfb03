//! Prometheus metrics for queue consumption.
//!
//! Only descriptions are registered here; installing an exporter is left to
//! the binary.

use crate::transport::{QueueDepths, QueueTransport};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;
use tracing::warn;

/// Metric names for the trade queue.
pub mod names {
    /// Total trades enqueued.
    pub const TRADES_ENQUEUED_TOTAL: &str = "tradeq_trades_enqueued_total";
    /// Total reservations taken from ready.
    pub const TRADES_RESERVED_TOTAL: &str = "tradeq_trades_reserved_total";
    /// Total trades committed to the store.
    pub const TRADES_COMMITTED_TOTAL: &str = "tradeq_trades_committed_total";
    /// Total trades scheduled for another attempt.
    pub const TRADES_RETRIED_TOTAL: &str = "tradeq_trades_retried_total";
    /// Total items sent to dead-letter.
    pub const TRADES_DEAD_LETTERED_TOTAL: &str = "tradeq_trades_dead_lettered_total";
    /// Total in-flight items moved back to ready at startup.
    pub const TRADES_RECOVERED_TOTAL: &str = "tradeq_trades_recovered_total";
    /// Total transport errors seen by the loop.
    pub const TRANSPORT_ERRORS_TOTAL: &str = "tradeq_transport_errors_total";

    /// Sink apply duration in seconds.
    pub const APPLY_DURATION_SECONDS: &str = "tradeq_apply_duration_seconds";

    /// Current ready length.
    pub const QUEUE_READY: &str = "tradeq_queue_ready";
    /// Current in-flight length.
    pub const QUEUE_IN_FLIGHT: &str = "tradeq_queue_in_flight";
    /// Current dead-letter length.
    pub const QUEUE_DEAD_LETTER: &str = "tradeq_queue_dead_letter";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::TRADES_ENQUEUED_TOTAL, "Total number of trades enqueued");
    describe_counter!(
        names::TRADES_RESERVED_TOTAL,
        "Total number of items reserved from the ready list"
    );
    describe_counter!(
        names::TRADES_COMMITTED_TOTAL,
        "Total number of trades committed to the store"
    );
    describe_counter!(
        names::TRADES_RETRIED_TOTAL,
        "Total number of trades scheduled for another attempt"
    );
    describe_counter!(
        names::TRADES_DEAD_LETTERED_TOTAL,
        "Total number of items sent to the dead-letter list"
    );
    describe_counter!(
        names::TRADES_RECOVERED_TOTAL,
        "Total number of in-flight items recovered at startup"
    );
    describe_counter!(
        names::TRANSPORT_ERRORS_TOTAL,
        "Total number of queue transport errors"
    );

    describe_histogram!(
        names::APPLY_DURATION_SECONDS,
        "Time spent applying a trade to the store in seconds"
    );

    describe_gauge!(names::QUEUE_READY, "Current length of the ready list");
    describe_gauge!(names::QUEUE_IN_FLIGHT, "Current length of the in-flight list");
    describe_gauge!(names::QUEUE_DEAD_LETTER, "Current length of the dead-letter list");
}

/// Queue metrics recorder.
#[derive(Clone)]
pub struct QueueMetrics;

impl QueueMetrics {
    /// Record a trade enqueued.
    pub fn trade_enqueued() {
        counter!(names::TRADES_ENQUEUED_TOTAL).increment(1);
    }

    /// Record a reservation.
    pub fn trade_reserved() {
        counter!(names::TRADES_RESERVED_TOTAL).increment(1);
    }

    /// Record a commit and how long the apply took.
    pub fn trade_committed(duration: Duration) {
        counter!(names::TRADES_COMMITTED_TOTAL).increment(1);
        histogram!(names::APPLY_DURATION_SECONDS, "status" => "committed")
            .record(duration.as_secs_f64());
    }

    /// Record a failed apply that will be retried.
    pub fn trade_retried(attempt: u32, duration: Duration) {
        counter!(names::TRADES_RETRIED_TOTAL, "attempt" => attempt.to_string()).increment(1);
        histogram!(names::APPLY_DURATION_SECONDS, "status" => "failed")
            .record(duration.as_secs_f64());
    }

    /// Record an item sent to dead-letter.
    ///
    /// `reason` is a fixed label (`invalid_payload` or `max_attempts`), never
    /// the free-form error text.
    pub fn trade_dead_lettered(reason: &'static str) {
        counter!(names::TRADES_DEAD_LETTERED_TOTAL, "reason" => reason).increment(1);
    }

    /// Record items recovered by a sweep.
    pub fn trades_recovered(count: u64) {
        counter!(names::TRADES_RECOVERED_TOTAL).increment(count);
    }

    /// Record a transport error.
    pub fn transport_error() {
        counter!(names::TRANSPORT_ERRORS_TOTAL).increment(1);
    }

    /// Update queue depth gauges.
    #[allow(clippy::cast_precision_loss)]
    pub fn update_depths(depths: QueueDepths) {
        gauge!(names::QUEUE_READY).set(depths.ready as f64);
        gauge!(names::QUEUE_IN_FLIGHT).set(depths.in_flight as f64);
        gauge!(names::QUEUE_DEAD_LETTER).set(depths.dead_letter as f64);
    }

    /// Reads the current depths and publishes them as gauges.
    ///
    /// A failed read is logged and leaves the gauges untouched.
    pub async fn refresh_depths<T>(transport: &T) -> Option<QueueDepths>
    where
        T: QueueTransport + ?Sized,
    {
        match transport.depths().await {
            Ok(depths) => {
                Self::update_depths(depths);
                Some(depths)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read queue depths");
                None
            }
        }
    }
}
