//! Bounded concurrent fan-out.
//!
//! This module provides:
//! - `WorkerPool`: runs an `ItemProcessor` with at most N invocations in flight
//! - `CompletionTracker`: counts outstanding items and wakes the owner at zero
//! - `dispatch`: feeds a materialized item list through the pool in order
//!
//! # Example
//!
//! ```ignore
//! use vmexport_core::pool::{dispatch, WorkerPool};
//!
//! let pool = WorkerPool::new(100, exporter)?;
//! let report = dispatch(&pool, items).await?;
//! pool.shutdown().await;
//!
//! println!("{} exported, {} failed", report.succeeded(), report.failed());
//! ```

mod dispatcher;
mod error;
mod tracker;
mod traits;
mod types;
mod worker_pool;

pub use dispatcher::dispatch;
pub use error::PoolError;
pub use tracker::{CompletionGuard, CompletionTracker};
pub use traits::ItemProcessor;
pub use types::{BatchReport, ItemReport, PoolStatus};
pub use worker_pool::{Batch, WorkerPool};
