//! Instrumented item processor for pool tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::pool::ItemProcessor;
use crate::resource::ResourceObject;

/// Mock implementation of the ItemProcessor trait.
///
/// Records the name of every processed object, tracks how many invocations
/// overlap, and can be told to fail for specific names or to take a while.
#[derive(Debug, Default)]
pub struct MockProcessor {
    touched: Mutex<Vec<String>>,
    fail_names: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make each invocation sleep for `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
        self
    }

    /// Make invocations for `name` fail.
    pub fn fail_on(self, name: &str) -> Self {
        self.fail_names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string());
        self
    }

    /// Names processed so far, in completion order.
    pub fn touched(&self) -> Vec<String> {
        self.touched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Highest number of overlapping invocations observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Lets a test keep a handle on the processor after moving it into a pool.
#[async_trait]
impl ItemProcessor for Arc<MockProcessor> {
    type Item = ResourceObject;
    type Output = String;
    type Error = String;

    fn name(&self) -> &str {
        "mock"
    }

    async fn process(&self, item: ResourceObject) -> Result<String, String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        let name = item.name().to_string();
        self.touched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(name.clone());
        let fail = self
            .fail_names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&name);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fail {
            Err(format!("{} failed", name))
        } else {
            Ok(name)
        }
    }
}
