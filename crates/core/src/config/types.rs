use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

use crate::export::{DEFAULT_FILE_MODE, DEFAULT_GROUP, DEFAULT_RESOURCE};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

/// Where exported files go
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Base collection directory. Required; there is no default.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    /// Permission bits for written files (Unix only). Always read as octal
    /// digits: `664`, `"0664"` and `"0o664"` all mean `rw-rw-r--`.
    #[serde(
        default = "default_file_mode",
        deserialize_with = "deserialize_file_mode",
        serialize_with = "serialize_file_mode"
    )]
    pub file_mode: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            file_mode: default_file_mode(),
        }
    }
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

/// Parse a permission mode written in octal, with optional `0o` prefix
pub fn parse_file_mode(raw: &str) -> Result<u32, String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| format!("invalid octal file mode {:?}", raw))?;
    if mode > 0o7777 {
        return Err(format!("file mode {:?} is out of range", raw));
    }
    Ok(mode)
}

// Environment values such as `0664` arrive as the integer 664, so integers
// are read by their decimal digits too.
fn deserialize_file_mode<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawMode {
        Digits(u64),
        Text(String),
    }

    let raw = match RawMode::deserialize(deserializer)? {
        RawMode::Digits(n) => n.to_string(),
        RawMode::Text(s) => s,
    };
    parse_file_mode(&raw).map_err(serde::de::Error::custom)
}

fn serialize_file_mode<S>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{:04o}", mode))
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Maximum objects exported concurrently
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

fn default_max_workers() -> usize {
    100
}

/// Kubernetes API source configuration
///
/// When `api_server` is unset the connection is resolved from the in-cluster
/// service account, then from a kubeconfig file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// API server URL (e.g., "https://api.cluster.example:6443")
    #[serde(default)]
    pub api_server: Option<String>,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// File containing the bearer token
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    /// PEM bundle used to verify the API server
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate (requires `client_key_file`)
    #[serde(default)]
    pub client_cert_file: Option<PathBuf>,
    /// PKCS#8 PEM private key for `client_cert_file`
    #[serde(default)]
    pub client_key_file: Option<PathBuf>,
    /// Skip TLS verification of the API server
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    /// Kubeconfig path (falls back to $KUBECONFIG, then ~/.kube/config)
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    /// Only list objects in this namespace
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_resource")]
    pub resource: String,
    /// Page size for list requests (unset = single unpaginated request)
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_server: None,
            token: None,
            token_file: None,
            ca_file: None,
            client_cert_file: None,
            client_key_file: None,
            insecure_skip_tls_verify: false,
            kubeconfig: None,
            namespace: None,
            group: default_group(),
            version: default_version(),
            resource: default_resource(),
            page_size: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_resource() -> String {
    DEFAULT_RESOURCE.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub output: OutputConfig,
    pub pool: PoolConfig,
    pub source: SanitizedSourceConfig,
}

/// Sanitized source config (token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_server: Option<String>,
    pub token_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_cert_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub resource: String,
    pub insecure_skip_tls_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let source = &config.source;
        Self {
            output: config.output.clone(),
            pool: config.pool.clone(),
            source: SanitizedSourceConfig {
                api_server: source.api_server.clone(),
                token_configured: source.token.as_ref().is_some_and(|t| !t.is_empty()),
                token_file: source.token_file.clone(),
                client_cert_file: source.client_cert_file.clone(),
                kubeconfig: source.kubeconfig.clone(),
                namespace: source.namespace.clone(),
                resource: format!("{}/{}/{}", source.group, source.version, source.resource),
                insecure_skip_tls_verify: source.insecure_skip_tls_verify,
                page_size: source.page_size,
                timeout_secs: source.timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.output.base_dir.is_none());
        assert_eq!(config.output.file_mode, 0o664);
        assert_eq!(config.pool.max_workers, 100);
        assert_eq!(config.source.group, "kubevirt.io");
        assert_eq!(config.source.version, "v1");
        assert_eq!(config.source.resource, "virtualmachines");
        assert_eq!(config.source.timeout_secs, 30);
        assert!(config.source.page_size.is_none());
        assert!(!config.source.insecure_skip_tls_verify);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[output]
base_dir = "/must-gather"

[pool]
max_workers = 8

[source]
api_server = "https://api.example:6443"
token = "sha256~abc"
namespace = "vms"
page_size = 250
timeout_secs = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.output.base_dir.as_deref().unwrap().to_str().unwrap(),
            "/must-gather"
        );
        assert_eq!(config.pool.max_workers, 8);
        assert_eq!(config.source.api_server.as_deref(), Some("https://api.example:6443"));
        assert_eq!(config.source.namespace.as_deref(), Some("vms"));
        assert_eq!(config.source.page_size, Some(250));
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.source.resource, "virtualmachines"); // default
    }

    #[test]
    fn test_file_mode_is_octal() {
        for raw in ["file_mode = 664", "file_mode = \"0664\"", "file_mode = \"0o664\""] {
            let config: Config = toml::from_str(&format!("[output]\n{}", raw)).unwrap();
            assert_eq!(config.output.file_mode, 0o664, "{}", raw);
        }

        let config: Config = toml::from_str("[output]\nfile_mode = 600").unwrap();
        assert_eq!(config.output.file_mode, 0o600);
    }

    #[test]
    fn test_file_mode_rejects_non_octal() {
        assert!(toml::from_str::<Config>("[output]\nfile_mode = 689").is_err());
        assert!(toml::from_str::<Config>("[output]\nfile_mode = \"rw-r--r--\"").is_err());
        assert!(toml::from_str::<Config>("[output]\nfile_mode = 17777").is_err());
    }

    #[test]
    fn test_file_mode_serializes_as_octal() {
        let config = Config::default();
        let json = serde_json::to_string(&config.output).unwrap();
        assert!(json.contains("\"file_mode\":\"0664\""));

        let back: OutputConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_mode, 0o664);
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let mut config = Config::default();
        config.source.token = Some("secret-token".to_string());
        config.source.api_server = Some("https://api.example:6443".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.source.token_configured);
        assert_eq!(sanitized.source.resource, "kubevirt.io/v1/virtualmachines");

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-token"));
    }

    #[test]
    fn test_sanitized_config_without_token() {
        let config = Config::default();
        let sanitized = SanitizedConfig::from(&config);
        assert!(!sanitized.source.token_configured);
        assert!(sanitized.source.api_server.is_none());
    }
}
