//! Object listing abstraction.
//!
//! This module provides an `ItemSource` trait for enumerating the objects to
//! export, and `KubeApiSource`, which lists a custom resource from the
//! Kubernetes API server.
//!
//! The cluster connection is resolved in this order:
//! - explicit `source.api_server` (with `token`/`token_file`/`ca_file`)
//! - the in-cluster service account
//! - the current context of a kubeconfig file
//!
//! Bearer tokens and client certificates are supported; client keys must be
//! PKCS#8 PEM.

mod connection;
mod error;
mod kube_api;
mod traits;

pub use connection::{ClusterConnection, ConnectionOrigin, SERVICE_ACCOUNT_DIR};
pub use error::SourceError;
pub use kube_api::KubeApiSource;
pub use traits::ItemSource;
