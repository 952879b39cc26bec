//! Error types for the source module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while listing objects. All of them are fatal for
/// the batch: nothing is dispatched from a failed listing.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No usable cluster connection could be resolved.
    #[error("No cluster connection available: {0}")]
    NoConnection(String),

    /// The kubeconfig file exists but cannot be used.
    #[error("Invalid kubeconfig {path}: {reason}")]
    InvalidKubeconfig { path: PathBuf, reason: String },

    /// Failed to read a token, CA bundle or kubeconfig.
    #[error("Failed to read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be built (bad CA bundle, TLS backend).
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to the API server.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The API server answered with a non-success status.
    #[error("API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The list response body could not be understood.
    #[error("Malformed list response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    pub(crate) fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_connect() {
            SourceError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            SourceError::MalformedResponse(e.to_string())
        } else {
            SourceError::ConnectionFailed(e.to_string())
        }
    }
}
