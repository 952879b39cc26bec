//! Sequential dispatch of a materialized item list into a worker pool.

use tracing::{debug, info, warn};

use super::error::PoolError;
use super::traits::ItemProcessor;
use super::types::BatchReport;
use super::worker_pool::{Batch, WorkerPool};

/// Submits every item to `pool` in order and waits for all of them to finish.
///
/// The batch tracker is charged with the full item count before the first
/// submission. Submission order follows the iterator; completion order is
/// whatever the workers produce.
///
/// If the pool refuses a submission (it was shut down), the units of the items
/// that were never submitted are retired, in-flight items are still awaited,
/// and `PoolError::ShutDown` is returned.
pub async fn dispatch<P, I>(
    pool: &WorkerPool<P>,
    items: I,
) -> Result<BatchReport<P::Output, P::Error>, PoolError>
where
    P: ItemProcessor,
    I: IntoIterator<Item = P::Item>,
    I::IntoIter: ExactSizeIterator,
{
    let items = items.into_iter();
    let total = items.len();

    let batch = Batch::new();
    batch.tracker().add(total);

    info!(
        processor = pool.processor().name(),
        items = total,
        capacity = pool.capacity(),
        "Dispatching batch"
    );

    for (submitted, item) in items.enumerate() {
        if let Err(e) = pool.submit(item, &batch).await {
            let skipped = total - submitted;
            warn!(submitted, skipped, error = %e, "Dispatch aborted");
            batch.tracker().retire(skipped);
            batch.finish().await;
            return Err(e);
        }
    }

    debug!(items = total, "All items submitted, waiting for workers");
    let report = batch.finish().await;

    info!(
        processor = pool.processor().name(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        duration_ms = report.duration_ms,
        "Batch complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<u32>>>,
    }

    #[async_trait]
    impl ItemProcessor for Recorder {
        type Item = u32;
        type Output = u32;
        type Error = String;

        fn name(&self) -> &str {
            "recorder"
        }

        async fn process(&self, item: u32) -> Result<u32, String> {
            tokio::task::yield_now().await;
            self.seen.lock().unwrap().push(item);
            if item % 10 == 0 {
                Err(format!("item {} rejected", item))
            } else {
                Ok(item)
            }
        }
    }

    #[tokio::test]
    async fn test_dispatch_empty_batch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = WorkerPool::new(4, Recorder { seen: Arc::clone(&seen) }).unwrap();

        let report = dispatch(&pool, Vec::new()).await.unwrap();
        assert_eq!(report.submitted, 0);
        assert!(report.reports.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_processes_each_item_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = WorkerPool::new(3, Recorder { seen: Arc::clone(&seen) }).unwrap();

        let report = dispatch(&pool, 1..51u32).await.unwrap();
        pool.shutdown().await;

        assert_eq!(report.submitted, 50);
        assert_eq!(report.reports.len(), 50);
        assert_eq!(report.failed(), 5);
        assert_eq!(report.succeeded(), 45);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 50);
        let unique: HashSet<_> = seen.iter().copied().collect();
        assert_eq!(unique, (1..51).collect::<HashSet<u32>>());

        let seqs: HashSet<_> = report.reports.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, (0..50).collect::<HashSet<usize>>());
    }

    #[tokio::test]
    async fn test_dispatch_failure_seq_matches_source_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = WorkerPool::new(2, Recorder { seen }).unwrap();

        let report = dispatch(&pool, vec![7u32, 20, 3]).await.unwrap();
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(failures[0].1, "item 20 rejected");
    }

    /// Panics on item 2.
    struct Boom;

    #[async_trait]
    impl ItemProcessor for Boom {
        type Item = u32;
        type Output = u32;
        type Error = String;

        fn name(&self) -> &str {
            "boom"
        }

        async fn process(&self, item: u32) -> Result<u32, String> {
            tokio::task::yield_now().await;
            if item == 2 {
                panic!("boom on {}", item);
            }
            Ok(item)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_counts_panicking_item_as_failed() {
        let pool = WorkerPool::new(2, Boom).unwrap();

        let report = dispatch(&pool, vec![1u32, 2, 3]).await.unwrap();
        pool.shutdown().await;

        assert_eq!(report.submitted, 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded() + report.failed(), report.submitted);
        assert_eq!(report.panicked, vec![1]);
        assert_eq!(report.failures().count(), 0);

        let status = pool.status();
        assert_eq!(status.total_processed, 2);
        assert_eq!(status.total_failed, 1);
        assert_eq!(status.active, 0);
    }

    #[tokio::test]
    async fn test_dispatch_into_shut_down_pool() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = WorkerPool::new(2, Recorder { seen: Arc::clone(&seen) }).unwrap();
        pool.shutdown().await;

        let result = dispatch(&pool, vec![1u32, 2, 3]).await;
        assert!(matches!(result, Err(PoolError::ShutDown)));
        assert!(seen.lock().unwrap().is_empty());
    }
}
