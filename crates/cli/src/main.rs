mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vmexport_core::{
    load_config, run_export, validate_config, KubeApiSource, OutputLayout, SanitizedConfig,
    YamlExporter,
};

use cli::Args;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.log_json);

    if let Err(e) = run(args).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    );

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(args: Args) -> Result<()> {
    info!("Starting vm-export v{}", VERSION);

    // Load configuration
    let mut config = load_config(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load config from environment".to_string(),
    })?;
    args.apply(&mut config);

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Effective configuration: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    let base_dir = config
        .output
        .base_dir
        .clone()
        .context("Base collection directory is not set")?;

    // Create source
    let source = KubeApiSource::from_config(&config.source)
        .context("Failed to connect to the Kubernetes API")?;
    info!("Using API server {}", source.connection().server);

    // Create exporter
    let layout = OutputLayout::new(&base_dir)
        .with_resource(&config.source.group, &config.source.resource);
    let exporter = YamlExporter::new(layout).with_file_mode(config.output.file_mode);

    let summary = run_export(&source, exporter, config.pool.max_workers)
        .await
        .context("Export failed")?;

    if summary.is_empty() {
        info!("No virtual machines found");
        return Ok(());
    }

    info!(
        "Exported {} of {} virtual machines to {} ({} failed, {} ms)",
        summary.exported(),
        summary.listed,
        base_dir.display(),
        summary.failed(),
        summary.report.duration_ms
    );

    Ok(())
}
