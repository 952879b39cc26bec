//! Mock item source for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::resource::ResourceObject;
use crate::source::{ItemSource, SourceError};

/// Mock implementation of the ItemSource trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable list of objects
/// - Simulate a failed listing
/// - Count list calls
///
/// # Example
///
/// ```rust,ignore
/// use vmexport_core::testing::{fixtures, MockSource};
///
/// let source = MockSource::with_items(vec![fixtures::vm("a", "n1", &[])]);
/// let objects = source.list().await?;
/// assert_eq!(objects.len(), 1);
/// assert_eq!(source.list_calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    items: Arc<RwLock<Vec<ResourceObject>>>,
    next_error: Arc<RwLock<Option<SourceError>>>,
    list_calls: AtomicUsize,
}

impl MockSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source returning `items`.
    pub fn with_items(items: Vec<ResourceObject>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            ..Self::default()
        }
    }

    /// Replace the objects returned by `list`.
    pub async fn set_items(&self, items: Vec<ResourceObject>) {
        *self.items.write().await = items;
    }

    /// Configure the next `list` call to fail with the given error.
    pub async fn set_next_error(&self, error: SourceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of `list` calls made so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list(&self) -> Result<Vec<ResourceObject>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self.items.read().await.clone())
    }
}
