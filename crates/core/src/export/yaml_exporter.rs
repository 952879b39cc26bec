//! YAML file exporter.

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::pool::ItemProcessor;
use crate::resource::ResourceObject;

use super::category::Category;
use super::error::ExportError;
use super::layout::OutputLayout;
use super::types::ExportedFile;

/// Default permission bits for written files (Unix only).
pub const DEFAULT_FILE_MODE: u32 = 0o664;

/// Writes each object to its own YAML file according to an [`OutputLayout`].
#[derive(Debug, Clone)]
pub struct YamlExporter {
    layout: OutputLayout,
    file_mode: u32,
}

impl YamlExporter {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            file_mode: DEFAULT_FILE_MODE,
        }
    }

    /// Sets the permission bits for written files.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Classifies, serializes and writes one object.
    ///
    /// An existing file for the same identity is truncated and replaced.
    pub async fn export(&self, mut object: ResourceObject) -> Result<ExportedFile, ExportError> {
        let namespace = object.namespace().to_string();
        let name = object.name().to_string();
        if name.is_empty() {
            return Err(ExportError::MissingName { namespace });
        }

        let category = Category::of(&object);
        let dir = self.layout.directory(&namespace, category);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ExportError::DirectoryCreationFailed {
                path: dir.clone(),
                source: e,
            })?;

        object.strip_managed_fields();
        let yaml = serde_yaml::to_string(object.as_map()).map_err(|e| {
            ExportError::SerializationFailed {
                namespace: namespace.clone(),
                name: name.clone(),
                source: e,
            }
        })?;

        let path = dir.join(format!("{}.yaml", name));
        self.write_file(&path, yaml.as_bytes()).await?;

        debug!(
            namespace = %namespace,
            name = %name,
            category = %category,
            path = %path.display(),
            "Exported object"
        );

        Ok(ExportedFile {
            namespace,
            name,
            category,
            size_bytes: yaml.len() as u64,
            path,
        })
    }

    async fn write_file(&self, path: &std::path::Path, contents: &[u8]) -> Result<(), ExportError> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(self.file_mode);

        let mut file = options
            .open(path)
            .await
            .map_err(|e| ExportError::write_failed(path.to_path_buf(), e))?;
        file.write_all(contents)
            .await
            .map_err(|e| ExportError::write_failed(path.to_path_buf(), e))?;
        file.flush()
            .await
            .map_err(|e| ExportError::write_failed(path.to_path_buf(), e))?;

        Ok(())
    }
}

#[async_trait]
impl ItemProcessor for YamlExporter {
    type Item = ResourceObject;
    type Output = ExportedFile;
    type Error = ExportError;

    fn name(&self) -> &str {
        "yaml"
    }

    async fn process(&self, item: ResourceObject) -> Result<ExportedFile, ExportError> {
        let namespace = item.namespace().to_string();
        let name = item.name().to_string();

        self.export(item).await.inspect_err(|e| {
            warn!(
                namespace = %namespace,
                name = %name,
                error = %e,
                "Failed to export object"
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn vm(name: &str, namespace: &str, labels: serde_json::Value) -> ResourceObject {
        ResourceObject::from_value(json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachine",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": labels,
                "managedFields": [
                    { "manager": "virt-controller", "operation": "Update" }
                ]
            },
            "spec": { "running": false }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_export_custom_vm() {
        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let file = exporter.export(vm("a", "n1", json!({}))).await.unwrap();
        let expected = temp
            .path()
            .join("namespaces/n1/kubevirt.io/virtualmachines/custom/a.yaml");
        assert_eq!(file.path, expected);
        assert_eq!(file.category, Category::Custom);
        assert!(expected.exists());

        let contents = std::fs::read_to_string(&expected).unwrap();
        assert_eq!(file.size_bytes, contents.len() as u64);
        assert!(contents.contains("kind: VirtualMachine"));
        assert!(contents.contains("name: a"));
        assert!(!contents.contains("managedFields"));
        assert!(!contents.contains("virt-controller"));
    }

    #[tokio::test]
    async fn test_export_template_based_vm() {
        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let file = exporter
            .export(vm("b", "n1", json!({ "vm.kubevirt.io/template": "fedora-server" })))
            .await
            .unwrap();
        assert_eq!(file.category, Category::TemplateBased);
        assert!(temp
            .path()
            .join("namespaces/n1/kubevirt.io/virtualmachines/template-based/b.yaml")
            .exists());
    }

    #[tokio::test]
    async fn test_export_yaml_parses_back() {
        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let file = exporter.export(vm("c", "n2", json!({ "app": "db" }))).await.unwrap();
        let contents = std::fs::read_to_string(&file.path).unwrap();
        let parsed: serde_json::Value = serde_yaml::from_str(&contents).unwrap();
        assert_eq!(parsed["metadata"]["labels"]["app"], json!("db"));
        assert_eq!(parsed["spec"]["running"], json!(false));
        assert!(parsed["metadata"].get("managedFields").is_none());
    }

    #[tokio::test]
    async fn test_rerun_truncates_existing_file() {
        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let mut big = vm("a", "n1", json!({})).into_map();
        big["spec"]["description"] = json!("x".repeat(4096));

        let first = exporter.export(ResourceObject::new(big)).await.unwrap();
        let second = exporter.export(vm("a", "n1", json!({}))).await.unwrap();
        assert_eq!(first.path, second.path);
        assert!(second.size_bytes < first.size_bytes);

        let on_disk = std::fs::metadata(&second.path).unwrap().len();
        assert_eq!(on_disk, second.size_bytes);
        let contents = std::fs::read_to_string(&second.path).unwrap();
        assert!(!contents.contains("xxxx"));
    }

    #[tokio::test]
    async fn test_missing_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        let nameless = ResourceObject::from_value(json!({ "metadata": { "namespace": "n1" } })).unwrap();
        let err = exporter.process(nameless).await.unwrap_err();
        assert!(matches!(err, ExportError::MissingName { ref namespace } if namespace == "n1"));
    }

    #[tokio::test]
    async fn test_directory_creation_failure() {
        let temp = TempDir::new().unwrap();
        // A regular file where the base directory should be.
        let base = temp.path().join("not-a-dir");
        std::fs::write(&base, b"occupied").unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(&base));

        let err = exporter.process(vm("a", "n1", json!({}))).await.unwrap_err();
        assert!(matches!(err, ExportError::DirectoryCreationFailed { .. }));
        assert!(err.path().unwrap().starts_with(&base));
    }

    #[tokio::test]
    async fn test_write_failure() {
        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path()));

        // A directory where the output file should be.
        let target = temp
            .path()
            .join("namespaces/n1/kubevirt.io/virtualmachines/custom/a.yaml");
        std::fs::create_dir_all(&target).unwrap();

        let err = exporter.process(vm("a", "n1", json!({}))).await.unwrap_err();
        assert!(matches!(err, ExportError::WriteFailed { .. }));
        assert_eq!(err.path(), Some(&target));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_mode_applied_on_create() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let exporter = YamlExporter::new(OutputLayout::new(temp.path())).with_file_mode(0o600);

        let file = exporter.export(vm("a", "n1", json!({}))).await.unwrap();
        let mode = std::fs::metadata(&file.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
