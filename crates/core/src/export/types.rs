//! Types for the export module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::category::Category;

/// Information about a written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    /// Object namespace.
    pub namespace: String,
    /// Object name.
    pub name: String,
    /// Category the object was filed under.
    pub category: Category,
    /// Final path.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
}
