//! Export module for writing listed objects to YAML files.
//!
//! This module provides the `YamlExporter`, the item processor run by the
//! worker pool for every listed virtual machine. For each object it:
//!
//! - Classifies it as `custom` or `template-based` from its labels
//! - Creates `<base>/namespaces/<ns>/<group>/<resource>/<category>/`
//! - Strips `metadata.managedFields`
//! - Writes `<name>.yaml`, replacing any previous export
//!
//! # Example
//!
//! ```ignore
//! use vmexport_core::export::{OutputLayout, YamlExporter};
//!
//! let exporter = YamlExporter::new(OutputLayout::new("/must-gather"));
//! let file = exporter.export(vm).await?;
//! println!("Wrote {} ({} bytes)", file.path.display(), file.size_bytes);
//! ```

mod category;
mod error;
mod layout;
mod types;
mod yaml_exporter;

pub use category::{Category, TEMPLATE_LABEL_PREFIX};
pub use error::ExportError;
pub use layout::{OutputLayout, DEFAULT_GROUP, DEFAULT_RESOURCE};
pub use types::ExportedFile;
pub use yaml_exporter::{YamlExporter, DEFAULT_FILE_MODE};
