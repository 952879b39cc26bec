use std::path::PathBuf;

use clap::Parser;
use vmexport_core::Config;

/// Command-line arguments for vm-export
#[derive(Parser, Debug)]
#[command(name = "vm-export")]
#[command(about = "Export KubeVirt virtual machines to YAML files")]
#[command(version)]
pub struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, env = "VM_EXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base collection directory (overrides BASE_COLLECTION_PATH)
    #[arg(short, long)]
    pub base_dir: Option<PathBuf>,

    /// Maximum number of objects exported concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Only export objects from this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Kubeconfig file used when not running in a cluster
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(base_dir) = &self.base_dir {
            config.output.base_dir = Some(base_dir.clone());
        }
        if let Some(workers) = self.workers {
            config.pool.max_workers = workers;
        }
        if let Some(namespace) = &self.namespace {
            config.source.namespace = Some(namespace.clone());
        }
        if let Some(kubeconfig) = &self.kubeconfig {
            config.source.kubeconfig = Some(kubeconfig.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_config_untouched() {
        let args = Args::try_parse_from(["vm-export"]).unwrap();
        assert!(!args.log_json);

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.pool.max_workers, 100);
        assert!(config.output.base_dir.is_none());
        assert!(config.source.namespace.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "vm-export",
            "--base-dir",
            "/must-gather",
            "--workers",
            "8",
            "--namespace",
            "prod",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--log-json",
        ])
        .unwrap();
        assert!(args.log_json);

        let mut config = Config::default();
        config.output.base_dir = Some(PathBuf::from("/from-env"));
        args.apply(&mut config);

        assert_eq!(config.output.base_dir, Some(PathBuf::from("/must-gather")));
        assert_eq!(config.pool.max_workers, 8);
        assert_eq!(config.source.namespace.as_deref(), Some("prod"));
        assert_eq!(
            config.source.kubeconfig,
            Some(PathBuf::from("/tmp/kubeconfig"))
        );
    }

    #[test]
    fn test_rejects_non_numeric_workers() {
        assert!(Args::try_parse_from(["vm-export", "--workers", "lots"]).is_err());
    }
}
