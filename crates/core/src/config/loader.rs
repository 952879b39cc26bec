use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides, e.g. `VM_EXPORT_POOL__MAX_WORKERS=20`
pub const ENV_PREFIX: &str = "VM_EXPORT_";

/// Environment variable naming the base collection directory
pub const BASE_COLLECTION_PATH_ENV: &str = "BASE_COLLECTION_PATH";

/// Load configuration from an optional TOML file with environment overrides
///
/// Precedence, lowest first: file, `BASE_COLLECTION_PATH`, `VM_EXPORT_*`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: Config = figment
        .merge(
            Env::raw()
                .only(&[BASE_COLLECTION_PATH_ENV])
                .map(|_| "output.base_dir".into()),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
