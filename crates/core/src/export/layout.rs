//! Output directory layout.

use std::path::{Path, PathBuf};

use super::category::Category;

pub const DEFAULT_GROUP: &str = "kubevirt.io";
pub const DEFAULT_RESOURCE: &str = "virtualmachines";

/// Maps an object's identity to its place under the base directory:
/// `<base>/namespaces/<namespace>/<group>/<resource>/<category>/<name>.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    base_dir: PathBuf,
    group: String,
    resource: String,
}

impl OutputLayout {
    /// Layout for KubeVirt virtual machines under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            group: DEFAULT_GROUP.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
        }
    }

    /// Overrides the API group and resource path segments.
    pub fn with_resource(mut self, group: impl Into<String>, resource: impl Into<String>) -> Self {
        self.group = group.into();
        self.resource = resource.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding every object of `category` in `namespace`.
    pub fn directory(&self, namespace: &str, category: Category) -> PathBuf {
        self.base_dir
            .join("namespaces")
            .join(namespace)
            .join(&self.group)
            .join(&self.resource)
            .join(category.as_str())
    }

    /// Full path of the file for one object.
    pub fn file_path(&self, namespace: &str, category: Category, name: &str) -> PathBuf {
        self.directory(namespace, category)
            .join(format!("{}.yaml", name))
    }
}
