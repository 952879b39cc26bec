//! End-to-end export run: list, fan out, drain, shut down.

use thiserror::Error;
use tracing::info;

use crate::export::{ExportError, ExportedFile, YamlExporter};
use crate::pool::{dispatch, BatchReport, PoolError, PoolStatus, WorkerPool};
use crate::source::{ItemSource, SourceError};

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Listing failed; nothing was exported.
    #[error("Failed to list objects: {0}")]
    Source(#[from] SourceError),

    /// The worker pool could not be used.
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}

/// What a run did.
#[derive(Debug)]
pub struct ExportSummary {
    /// Objects returned by the source.
    pub listed: usize,
    /// Per-object outcomes.
    pub report: BatchReport<ExportedFile, ExportError>,
    /// Final pool accounting, `None` if nothing was listed.
    pub pool: Option<PoolStatus>,
}

impl ExportSummary {
    fn empty() -> Self {
        Self {
            listed: 0,
            report: BatchReport {
                submitted: 0,
                reports: Vec::new(),
                panicked: Vec::new(),
                duration_ms: 0,
            },
            pool: None,
        }
    }

    /// Files written.
    pub fn exported(&self) -> usize {
        self.report.succeeded()
    }

    /// Objects that could not be exported.
    pub fn failed(&self) -> usize {
        self.report.failed()
    }

    /// Whether the source returned nothing.
    pub fn is_empty(&self) -> bool {
        self.listed == 0
    }
}

/// Lists every object from `source` and exports them with at most
/// `max_workers` concurrent writes.
///
/// The pool is shut down only after every dispatched object has finished.
/// Per-object failures are reported in the summary and never abort the run.
pub async fn run_export<S>(
    source: &S,
    exporter: YamlExporter,
    max_workers: usize,
) -> Result<ExportSummary, RunError>
where
    S: ItemSource + ?Sized,
{
    let items = source.list().await?;
    if items.is_empty() {
        info!(source = source.name(), "No objects found");
        return Ok(ExportSummary::empty());
    }

    let listed = items.len();
    let base_dir = exporter.layout().base_dir().to_path_buf();
    let pool = WorkerPool::new(max_workers, exporter)?;

    let dispatched = dispatch(&pool, items).await;
    pool.shutdown().await;
    let report = dispatched?;
    let status = pool.status();

    info!(
        listed,
        exported = report.succeeded(),
        failed = report.failed(),
        peak_workers = status.peak_active,
        base_dir = %base_dir.display(),
        "Export finished"
    );

    Ok(ExportSummary {
        listed,
        report,
        pool: Some(status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::OutputLayout;
    use crate::testing::{fixtures, MockSource};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::new();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let summary = run_export(&source, exporter, 4).await.unwrap();
        assert!(summary.is_empty());
        assert!(summary.pool.is_none());
        assert_eq!(summary.exported(), 0);
        assert!(!temp.path().join("namespaces").exists());
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_before_dispatch() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::with_items(vec![fixtures::vm("a", "n1", &[])]);
        source
            .set_next_error(SourceError::Api {
                status: 401,
                body: "Unauthorized".to_string(),
            })
            .await;
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let err = run_export(&source, exporter, 4).await.unwrap_err();
        assert!(matches!(err, RunError::Source(SourceError::Api { status: 401, .. })));
        assert!(!temp.path().join("namespaces").exists());
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let temp = TempDir::new().unwrap();
        let source = MockSource::with_items(vec![fixtures::vm("a", "n1", &[])]);
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let err = run_export(&source, exporter, 0).await.unwrap_err();
        assert!(matches!(err, RunError::Pool(PoolError::InvalidCapacity)));
    }

    #[tokio::test]
    async fn test_failed_object_does_not_stop_run() {
        let temp = TempDir::new().unwrap();
        let nameless = crate::resource::ResourceObject::from_value(serde_json::json!({
            "metadata": { "namespace": "n1" }
        }))
        .unwrap();
        let source = MockSource::with_items(vec![
            fixtures::vm("a", "n1", &[]),
            nameless,
            fixtures::vm("c", "n2", &[]),
        ]);
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let summary = run_export(&source, exporter, 2).await.unwrap();
        assert_eq!(summary.listed, 3);
        assert_eq!(summary.exported(), 2);
        assert_eq!(summary.failed(), 1);

        let (seq, err) = summary.report.failures().next().unwrap();
        assert_eq!(seq, 1);
        assert!(matches!(err, ExportError::MissingName { .. }));

        let pool = summary.pool.unwrap();
        assert!(pool.shut_down);
        assert_eq!(pool.total_processed, 2);
        assert_eq!(pool.total_failed, 1);
    }

    #[tokio::test]
    async fn test_failed_object_warned_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let temp = TempDir::new().unwrap();
        let nameless = crate::resource::ResourceObject::from_value(serde_json::json!({
            "metadata": { "namespace": "n1" }
        }))
        .unwrap();
        let source = MockSource::with_items(vec![fixtures::vm("a", "n1", &[]), nameless]);
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let summary = run_export(&source, exporter, 1).await.unwrap();
        assert_eq!(summary.failed(), 1);

        let text = logs.text();
        assert_eq!(text.lines().filter(|l| l.contains("WARN")).count(), 1, "{}", text);
        assert!(text.contains("Failed to export object"));
    }
}
