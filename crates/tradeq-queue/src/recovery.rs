//! Startup recovery of stranded in-flight items.

use crate::error::QueueResult;
use crate::metrics::QueueMetrics;
use crate::transport::QueueTransport;
use tracing::info;

/// Moves every in-flight item back to the head of ready.
///
/// Must finish before the first reservation. Items are moved one atomic step
/// at a time, so a crash part-way leaves each item in exactly one list.
/// Returns the number of items recovered.
pub async fn recover_in_flight<T: QueueTransport + ?Sized>(transport: &T) -> QueueResult<u64> {
    let mut recovered = 0u64;
    while transport.requeue_one_in_flight().await? {
        recovered += 1;
    }

    if recovered > 0 {
        info!(count = recovered, "Requeued stranded in-flight items");
        QueueMetrics::trades_recovered(recovered);
    }

    QueueMetrics::refresh_depths(transport).await;

    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryQueue;
    use std::time::Duration;

    #[tokio::test]
    async fn test_recovers_all_in_flight() {
        let queue = MemoryQueue::new();
        for i in 0..3 {
            queue.push_in_flight(format!("item-{i}"));
        }

        let recovered = recover_in_flight(&queue).await.unwrap();

        assert_eq!(recovered, 3);
        assert!(queue.in_flight_items().is_empty());
        assert_eq!(queue.ready_items().len(), 3);
    }

    #[tokio::test]
    async fn test_recovered_items_served_before_new_work() {
        let queue = MemoryQueue::new();
        queue.push_raw("fresh");
        queue.push_in_flight("stranded");

        recover_in_flight(&queue).await.unwrap();

        let first = queue.reserve(Duration::from_millis(10)).await.unwrap();
        assert_eq!(first.as_deref(), Some("stranded"));
    }

    #[tokio::test]
    async fn test_empty_in_flight() {
        let queue = MemoryQueue::new();
        assert_eq!(recover_in_flight(&queue).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let queue = MemoryQueue::new();
        queue.push_in_flight("stranded");
        queue.fail_next(1);

        assert!(recover_in_flight(&queue).await.is_err());
        assert_eq!(queue.in_flight_items(), vec!["stranded"]);
    }
}
