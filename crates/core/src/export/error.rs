//! Error types for the export module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while exporting a single object.
///
/// Every variant is scoped to one object; none of them stop a batch.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The object has no `metadata.name`, so there is no file name.
    #[error("Object in namespace {namespace:?} has no name")]
    MissingName { namespace: String },

    /// Failed to create the output directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to render the object as YAML.
    #[error("Failed to convert {namespace}/{name} to YAML")]
    SerializationFailed {
        namespace: String,
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to create or write the output file.
    #[error("Failed to write file: {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Creates a write failed error.
    pub fn write_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::WriteFailed { path, source }
    }

    /// The path involved, if the failure happened on the filesystem.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::DirectoryCreationFailed { path, .. } | Self::WriteFailed { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
