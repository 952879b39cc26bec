//! Bounded worker pool implementation.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use super::error::PoolError;
use super::tracker::CompletionTracker;
use super::traits::ItemProcessor;
use super::types::{BatchReport, ItemReport, PoolStatus};

/// Tracks slot accounting for a pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicUsize,
    peak_active: AtomicUsize,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(now, Ordering::SeqCst);
    }

    fn record(&self, success: bool) {
        if success {
            self.total_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A held worker slot. Dropping it decrements the active count and then
/// returns the semaphore permit.
struct ActiveSlot {
    stats: Arc<PoolStats>,
    _permit: OwnedSemaphorePermit,
}

impl ActiveSlot {
    fn new(permit: OwnedSemaphorePermit, stats: Arc<PoolStats>) -> Self {
        stats.enter();
        Self {
            stats,
            _permit: permit,
        }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What a worker hands back for one item.
enum Delivery<O, E> {
    Report(ItemReport<O, E>),
    Panicked(usize),
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// One batch of submissions: its completion tracker and the channel the
/// workers report outcomes on.
pub struct Batch<O, E> {
    tracker: CompletionTracker,
    reports_tx: mpsc::UnboundedSender<Delivery<O, E>>,
    reports_rx: mpsc::UnboundedReceiver<Delivery<O, E>>,
    next_seq: AtomicUsize,
    started_at: Instant,
}

impl<O, E> Default for Batch<O, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, E> Batch<O, E> {
    /// Creates an empty batch. Callers `add` the item total to its tracker
    /// before submitting.
    pub fn new() -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            tracker: CompletionTracker::new(),
            reports_tx,
            reports_rx,
            next_seq: AtomicUsize::new(0),
            started_at: Instant::now(),
        }
    }

    /// The batch's completion tracker.
    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    fn next_seq(&self) -> usize {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Waits for the tracker to drain and collects every report.
    pub async fn finish(self) -> BatchReport<O, E> {
        let Self {
            tracker,
            reports_tx,
            mut reports_rx,
            next_seq,
            started_at,
        } = self;

        tracker.wait().await;
        drop(reports_tx);

        // Each worker queues its report before retiring its unit, so every
        // report is already in the channel once the tracker has drained.
        let mut reports = Vec::new();
        let mut panicked = Vec::new();
        while let Ok(delivery) = reports_rx.try_recv() {
            match delivery {
                Delivery::Report(report) => reports.push(report),
                Delivery::Panicked(seq) => panicked.push(seq),
            }
        }
        panicked.sort_unstable();

        BatchReport {
            submitted: next_seq.into_inner(),
            reports,
            panicked,
            duration_ms: started_at.elapsed().as_millis() as u64,
        }
    }
}

/// Runs an [`ItemProcessor`] on submitted items with at most `capacity`
/// invocations in flight.
pub struct WorkerPool<P: ItemProcessor> {
    capacity: usize,
    processor: Arc<P>,
    slots: Arc<Semaphore>,
    tasks: TaskTracker,
    stats: Arc<PoolStats>,
    shut_down: AtomicBool,
}

impl<P: ItemProcessor> WorkerPool<P> {
    /// Creates a pool with `capacity` worker slots.
    pub fn new(capacity: usize, processor: P) -> Result<Self, PoolError> {
        if capacity == 0 {
            return Err(PoolError::InvalidCapacity);
        }

        Ok(Self {
            capacity,
            processor: Arc::new(processor),
            slots: Arc::new(Semaphore::new(capacity)),
            tasks: TaskTracker::new(),
            stats: Arc::new(PoolStats::default()),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Maximum concurrent workers.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The processor every worker runs.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Returns the current slot accounting.
    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            capacity: self.capacity,
            active: self.stats.active.load(Ordering::SeqCst),
            peak_active: self.stats.peak_active.load(Ordering::SeqCst),
            total_processed: self.stats.total_processed.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
            shut_down: self.shut_down.load(Ordering::SeqCst),
        }
    }

    /// Submits one item.
    ///
    /// Waits for a free slot, starts processing in the background, and returns
    /// as soon as the task is spawned. The slot is released when the task
    /// ends, whatever the outcome. A panicking processor is reported as a
    /// failed item. The caller must already have counted the item in
    /// `batch.tracker()`.
    pub async fn submit(
        &self,
        item: P::Item,
        batch: &Batch<P::Output, P::Error>,
    ) -> Result<(), PoolError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::ShutDown)?;

        let slot = ActiveSlot::new(permit, Arc::clone(&self.stats));
        let seq = batch.next_seq();
        let completion = batch.tracker.guard();
        let reports_tx = batch.reports_tx.clone();
        let processor = Arc::clone(&self.processor);
        let stats = Arc::clone(&self.stats);

        self.tasks.spawn(async move {
            let delivery = match AssertUnwindSafe(processor.process(item))
                .catch_unwind()
                .await
            {
                Ok(result) => {
                    stats.record(result.is_ok());
                    Delivery::Report(ItemReport { seq, result })
                }
                Err(payload) => {
                    stats.record(false);
                    error!(
                        seq,
                        processor = processor.name(),
                        panic = panic_message(payload.as_ref()),
                        "Item processor panicked"
                    );
                    Delivery::Panicked(seq)
                }
            };

            if reports_tx.send(delivery).is_err() {
                warn!(seq, "Batch dropped before item report was delivered");
            }

            drop(completion);
            drop(slot);
        });

        Ok(())
    }

    /// Stops accepting submissions and waits for every spawned worker to exit.
    ///
    /// Call this after the batch tracker has drained. Repeated calls are
    /// harmless.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.slots.close();
        self.tasks.close();
        self.tasks.wait().await;

        let status = self.status();
        debug!(
            processor = self.processor.name(),
            processed = status.total_processed,
            failed = status.total_failed,
            peak_active = status.peak_active,
            "Worker pool shut down"
        );
    }
}
