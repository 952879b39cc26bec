//! Error types for the pool module.

use thiserror::Error;

/// Errors raised by the worker pool itself.
///
/// Per-item failures never show up here; they travel in the item reports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was built with zero slots.
    #[error("Worker pool capacity must be at least 1")]
    InvalidCapacity,

    /// A submission arrived after `shutdown`.
    #[error("Worker pool has been shut down")]
    ShutDown,
}
