//! Completion tracking for a batch of submitted items.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TrackerState {
    outstanding: AtomicUsize,
    drained: Notify,
}

/// Counts outstanding units of work and wakes waiters when the count hits zero.
///
/// Cloning is cheap; all clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    state: Arc<TrackerState>,
}

impl CompletionTracker {
    /// Creates a tracker with nothing outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` outstanding units.
    pub fn add(&self, n: usize) {
        self.state.outstanding.fetch_add(n, Ordering::SeqCst);
    }

    /// Retires one unit.
    pub fn done(&self) {
        self.retire(1);
    }

    /// Retires `n` units at once.
    ///
    /// Retiring more than is outstanding is a logic error: it panics in debug
    /// builds and saturates at zero otherwise.
    pub fn retire(&self, n: usize) {
        if n == 0 {
            return;
        }

        let previous = self
            .state
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                Some(c.saturating_sub(n))
            })
            .unwrap_or_else(|c| c);
        debug_assert!(
            previous >= n,
            "retired {} units with only {} outstanding",
            n,
            previous
        );

        if previous <= n {
            self.state.drained.notify_waiters();
        }
    }

    /// Current outstanding count.
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::SeqCst)
    }

    /// Waits until the outstanding count reaches zero.
    ///
    /// Returns immediately if nothing is outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.state.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent notify_waiters is not lost.
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Returns a guard that retires one unit when dropped.
    ///
    /// The guard does not add a unit; callers add the batch total up front.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard {
            tracker: self.clone(),
        }
    }
}

/// Retires exactly one tracker unit on drop, including during unwinding.
#[derive(Debug)]
pub struct CompletionGuard {
    tracker: CompletionTracker,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
