//! Resolution of the Kubernetes API server address and credentials.

use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::SourceError;
use crate::config::SourceConfig;

/// Service account mount inside a pod.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Where a connection's settings came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOrigin {
    /// `source.api_server` in the configuration.
    Explicit,
    /// The pod's service account.
    InCluster,
    /// A kubeconfig file.
    Kubeconfig(PathBuf),
}

/// Client certificate and private key, both PEM encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("cert_pem", &self.cert_pem.len())
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to one API server.
#[derive(Clone)]
pub struct ClusterConnection {
    /// Base URL, without trailing slash.
    pub server: String,
    /// Bearer token, if any.
    pub token: Option<String>,
    /// PEM bundle trusted for the server certificate.
    pub ca_pem: Option<Vec<u8>>,
    /// Client certificate authentication, if any.
    pub client_identity: Option<ClientIdentity>,
    pub insecure_skip_tls_verify: bool,
    pub origin: ConnectionOrigin,
}

impl std::fmt::Debug for ClusterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.as_ref().map(|p| p.len()))
            .field("client_identity", &self.client_identity)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("origin", &self.origin)
            .finish()
    }
}

impl ClusterConnection {
    /// A connection to `server` with no credentials.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_string(),
            token: None,
            ca_pem: None,
            client_identity: None,
            insecure_skip_tls_verify: false,
            origin: ConnectionOrigin::Explicit,
        }
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the client certificate and key.
    pub fn with_client_identity(mut self, cert_pem: Vec<u8>, key_pem: Vec<u8>) -> Self {
        self.client_identity = Some(ClientIdentity { cert_pem, key_pem });
        self
    }

    /// Resolves a connection: explicit settings, then the in-cluster service
    /// account, then a kubeconfig file.
    pub fn resolve(config: &SourceConfig) -> Result<Self, SourceError> {
        if let Some(server) = &config.api_server {
            return Self::explicit(server, config);
        }

        if let Some(connection) = Self::in_cluster()? {
            return Ok(connection);
        }

        let path = kubeconfig_path(config).ok_or_else(|| {
            SourceError::NoConnection(
                "not running in a cluster and no kubeconfig found (set KUBECONFIG or source.api_server)"
                    .to_string(),
            )
        })?;
        Self::from_kubeconfig(&path)
    }

    fn explicit(server: &str, config: &SourceConfig) -> Result<Self, SourceError> {
        let token = match (&config.token, &config.token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(path)) => Some(read_token(path)?),
            (None, None) => None,
        };
        let ca_pem = config
            .ca_file
            .as_deref()
            .map(|path| std::fs::read(path).map_err(|e| SourceError::read_failed(path, e)))
            .transpose()?;
        let client_identity = match (&config.client_cert_file, &config.client_key_file) {
            (Some(cert), Some(key)) => Some(ClientIdentity {
                cert_pem: std::fs::read(cert).map_err(|e| SourceError::read_failed(cert, e))?,
                key_pem: std::fs::read(key).map_err(|e| SourceError::read_failed(key, e))?,
            }),
            (None, None) => None,
            _ => {
                return Err(SourceError::NoConnection(
                    "source.client_cert_file and source.client_key_file must be set together"
                        .to_string(),
                ))
            }
        };

        Ok(Self {
            server: server.trim_end_matches('/').to_string(),
            token,
            ca_pem,
            client_identity,
            insecure_skip_tls_verify: config.insecure_skip_tls_verify,
            origin: ConnectionOrigin::Explicit,
        })
    }

    /// Connection from the pod environment, or `None` outside a cluster.
    pub fn in_cluster() -> Result<Option<Self>, SourceError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").ok();
        let port = std::env::var("KUBERNETES_SERVICE_PORT").ok();
        match (host, port) {
            (Some(host), Some(port)) => {
                Self::in_cluster_from(&host, &port, Path::new(SERVICE_ACCOUNT_DIR))
            }
            _ => Ok(None),
        }
    }

    /// In-cluster connection using an explicit service account directory.
    ///
    /// Returns `None` when the directory holds no token.
    pub fn in_cluster_from(
        host: &str,
        port: &str,
        service_account_dir: &Path,
    ) -> Result<Option<Self>, SourceError> {
        if host.is_empty() || port.is_empty() {
            return Ok(None);
        }

        let token_path = service_account_dir.join("token");
        if !token_path.exists() {
            debug!(path = %token_path.display(), "No service account token, not in cluster");
            return Ok(None);
        }
        let token = read_token(&token_path)?;

        let ca_path = service_account_dir.join("ca.crt");
        let ca_pem = if ca_path.exists() {
            Some(std::fs::read(&ca_path).map_err(|e| SourceError::read_failed(&ca_path, e))?)
        } else {
            None
        };

        let host = if host.contains(':') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        Ok(Some(Self {
            server: format!("https://{}:{}", host, port),
            token: Some(token),
            ca_pem,
            client_identity: None,
            insecure_skip_tls_verify: false,
            origin: ConnectionOrigin::InCluster,
        }))
    }

    /// Connection from the current context of a kubeconfig file.
    pub fn from_kubeconfig(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SourceError::read_failed(path, e))?;
        let invalid = |reason: String| SourceError::InvalidKubeconfig {
            path: path.to_path_buf(),
            reason,
        };

        let kubeconfig: Kubeconfig =
            serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

        let context_name = kubeconfig
            .current_context
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| invalid("current-context is not set".to_string()))?;
        let context = kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .map(|c| &c.context)
            .ok_or_else(|| invalid(format!("context {:?} not found", context_name)))?;
        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == context.cluster)
            .map(|c| &c.cluster)
            .ok_or_else(|| invalid(format!("cluster {:?} not found", context.cluster)))?;
        let user = match &context.user {
            Some(name) => Some(
                kubeconfig
                    .users
                    .iter()
                    .find(|u| &u.name == name)
                    .map(|u| &u.user)
                    .ok_or_else(|| invalid(format!("user {:?} not found", name)))?,
            ),
            None => None,
        };

        let ca_pem = inline_or_file(
            path,
            "certificate-authority-data",
            cluster.certificate_authority_data.as_deref(),
            cluster.certificate_authority.as_deref(),
        )?;

        let (token, client_identity) = match user {
            Some(user) => {
                let base = path.parent().unwrap_or_else(|| Path::new("."));
                let token = match (&user.token, &user.token_file) {
                    (Some(token), _) => Some(token.clone()),
                    (None, Some(token_file)) => Some(read_token(&base.join(token_file))?),
                    (None, None) => None,
                };

                let cert = inline_or_file(
                    path,
                    "client-certificate-data",
                    user.client_certificate_data.as_deref(),
                    user.client_certificate.as_deref(),
                )?;
                let key = inline_or_file(
                    path,
                    "client-key-data",
                    user.client_key_data.as_deref(),
                    user.client_key.as_deref(),
                )?;
                let client_identity = match (cert, key) {
                    (Some(cert_pem), Some(key_pem)) => Some(ClientIdentity { cert_pem, key_pem }),
                    (None, None) => None,
                    _ => {
                        return Err(invalid(
                            "client certificate and client key must be set together".to_string(),
                        ))
                    }
                };

                if token.is_none() && client_identity.is_none() {
                    warn!(
                        context = context_name,
                        "Kubeconfig user has neither a token nor a client certificate"
                    );
                }
                (token, client_identity)
            }
            None => (None, None),
        };

        Ok(Self {
            server: cluster.server.trim_end_matches('/').to_string(),
            token,
            ca_pem,
            client_identity,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
            origin: ConnectionOrigin::Kubeconfig(path.to_path_buf()),
        })
    }
}

/// `source.kubeconfig`, then `$KUBECONFIG` (first entry), then `~/.kube/config`.
fn kubeconfig_path(config: &SourceConfig) -> Option<PathBuf> {
    if let Some(path) = &config.kubeconfig {
        return Some(path.clone());
    }

    if let Some(paths) = std::env::var_os("KUBECONFIG") {
        if let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()) {
            return Some(first);
        }
    }

    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".kube").join("config"))
        .filter(|p| p.exists())
}

/// Reads a kubeconfig credential given either inline as base64 or as a path
/// relative to the kubeconfig's directory. Inline data wins.
fn inline_or_file(
    kubeconfig: &Path,
    field: &str,
    data: Option<&str>,
    file: Option<&Path>,
) -> Result<Option<Vec<u8>>, SourceError> {
    match (data, file) {
        (Some(data), _) => base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map(Some)
            .map_err(|e| SourceError::InvalidKubeconfig {
                path: kubeconfig.to_path_buf(),
                reason: format!("{}: {}", field, e),
            }),
        (None, Some(file)) => {
            let base = kubeconfig.parent().unwrap_or_else(|| Path::new("."));
            let path = base.join(file);
            std::fs::read(&path)
                .map(Some)
                .map_err(|e| SourceError::read_failed(&path, e))
        }
        (None, None) => Ok(None),
    }
}

fn read_token(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path)
        .map(|t| t.trim().to_string())
        .map_err(|e| SourceError::read_failed(path, e))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
    #[serde(default)]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    #[serde(default)]
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, rename = "tokenFile")]
    token_file: Option<PathBuf>,
    #[serde(default, rename = "client-certificate")]
    client_certificate: Option<PathBuf>,
    #[serde(default, rename = "client-certificate-data")]
    client_certificate_data: Option<String>,
    #[serde(default, rename = "client-key")]
    client_key: Option<PathBuf>,
    #[serde(default, rename = "client-key-data")]
    client_key_data: Option<String>,
}
