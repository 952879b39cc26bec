use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Base directory is set and non-empty
/// - Pool has at least one worker
/// - Resource path segments are plain identifiers
/// - Request timeout and page size are not 0
/// - Client certificate and key are configured together
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    match &config.output.base_dir {
        None => {
            return Err(ConfigError::ValidationError(
                "output.base_dir is not set (set BASE_COLLECTION_PATH or --base-dir)".to_string(),
            ))
        }
        Some(dir) if dir.as_os_str().is_empty() => {
            return Err(ConfigError::ValidationError(
                "output.base_dir cannot be empty".to_string(),
            ))
        }
        Some(_) => {}
    }

    if config.pool.max_workers == 0 {
        return Err(ConfigError::ValidationError(
            "pool.max_workers cannot be 0".to_string(),
        ));
    }

    let source = &config.source;
    for (field, value) in [
        ("source.group", &source.group),
        ("source.version", &source.version),
        ("source.resource", &source.resource),
    ] {
        if value.is_empty() || value.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "{} must be a single non-empty path segment, got {:?}",
                field, value
            )));
        }
    }

    if let Some(ns) = &source.namespace {
        if ns.is_empty() || ns.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "source.namespace is not a valid namespace: {:?}",
                ns
            )));
        }
    }

    if source.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "source.timeout_secs cannot be 0".to_string(),
        ));
    }

    if source.page_size == Some(0) {
        return Err(ConfigError::ValidationError(
            "source.page_size cannot be 0".to_string(),
        ));
    }

    if source.client_cert_file.is_some() != source.client_key_file.is_some() {
        return Err(ConfigError::ValidationError(
            "source.client_cert_file and source.client_key_file must be set together".to_string(),
        ));
    }

    Ok(())
}
