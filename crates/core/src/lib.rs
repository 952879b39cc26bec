pub mod config;
pub mod export;
pub mod pool;
pub mod resource;
pub mod runner;
pub mod source;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, OutputConfig,
    PoolConfig, SanitizedConfig, SourceConfig,
};
pub use export::{Category, ExportError, ExportedFile, OutputLayout, YamlExporter};
pub use pool::{
    dispatch, BatchReport, CompletionTracker, ItemProcessor, ItemReport, PoolError, PoolStatus,
    WorkerPool,
};
pub use resource::ResourceObject;
pub use runner::{run_export, ExportSummary, RunError};
pub use source::{ClusterConnection, ItemSource, KubeApiSource, SourceError};
