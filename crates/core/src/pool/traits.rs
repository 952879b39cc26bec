//! Trait definitions for the pool module.

use async_trait::async_trait;

/// Work performed on each item submitted to a [`WorkerPool`](super::WorkerPool).
///
/// Implementations own all per-item error handling: a failure is returned as
/// `Err` and is isolated to that item.
#[async_trait]
pub trait ItemProcessor: Send + Sync + 'static {
    /// The unit of work.
    type Item: Send + 'static;
    /// What a successful run produces.
    type Output: Send + 'static;
    /// What a failed run produces.
    type Error: std::fmt::Display + Send + 'static;

    /// Returns the name of this processor implementation.
    fn name(&self) -> &str;

    /// Processes one item.
    async fn process(&self, item: Self::Item) -> Result<Self::Output, Self::Error>;
}
