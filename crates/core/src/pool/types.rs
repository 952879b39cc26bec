//! Types for the pool module.

use serde::{Deserialize, Serialize};

/// Snapshot of a worker pool's slot accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Maximum concurrent workers.
    pub capacity: usize,
    /// Workers currently holding a slot.
    pub active: usize,
    /// Highest number of simultaneously active workers observed.
    pub peak_active: usize,
    /// Items whose processor returned `Ok`.
    pub total_processed: u64,
    /// Items whose processor returned `Err` or panicked.
    pub total_failed: u64,
    /// Whether `shutdown` has been called.
    pub shut_down: bool,
}

/// Outcome of processing one submitted item.
#[derive(Debug)]
pub struct ItemReport<O, E> {
    /// Zero-based submission index within the batch.
    pub seq: usize,
    /// What the processor returned.
    pub result: Result<O, E>,
}

impl<O, E> ItemReport<O, E> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a finished batch produced.
///
/// Reports are in completion order, not submission order.
#[derive(Debug)]
pub struct BatchReport<O, E> {
    /// Number of items that were handed to the pool.
    pub submitted: usize,
    /// One report per item whose processor returned.
    pub reports: Vec<ItemReport<O, E>>,
    /// Submission indices of items whose processor panicked.
    pub panicked: Vec<usize>,
    /// Wall-clock time from first submission to drain, in milliseconds.
    pub duration_ms: u64,
}

impl<O, E> BatchReport<O, E> {
    /// Number of items that succeeded.
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_ok()).count()
    }

    /// Number of items that failed, panics included.
    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded() + self.panicked.len()
    }

    /// Successful outputs.
    pub fn outputs(&self) -> impl Iterator<Item = &O> {
        self.reports.iter().filter_map(|r| r.result.as_ref().ok())
    }

    /// Failures with their submission index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &E)> {
        self.reports
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.seq, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_report_counts() {
        let report: BatchReport<&str, String> = BatchReport {
            submitted: 4,
            reports: vec![
                ItemReport { seq: 2, result: Ok("c") },
                ItemReport { seq: 0, result: Err("disk full".to_string()) },
                ItemReport { seq: 1, result: Ok("b") },
            ],
            panicked: vec![3],
            duration_ms: 5,
        };

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.outputs().copied().collect::<Vec<_>>(), vec!["c", "b"]);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 0);
        assert_eq!(failures[0].1, "disk full");
    }

    #[test]
    fn test_pool_status_serialization() {
        let status = PoolStatus {
            capacity: 4,
            active: 2,
            peak_active: 4,
            total_processed: 100,
            total_failed: 3,
            shut_down: false,
        };

        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"capacity\":4"));
        assert!(json.contains("\"peak_active\":4"));
    }
}
