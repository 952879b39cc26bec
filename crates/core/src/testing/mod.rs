//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the pipeline's seams,
//! allowing tests to run without a cluster.
//!
//! # Example
//!
//! ```rust,ignore
//! use vmexport_core::testing::{fixtures, MockSource};
//!
//! let source = MockSource::with_items(vec![
//!     fixtures::vm("a", "n1", &[]),
//!     fixtures::vm("b", "n1", &[("vm.kubevirt.io/template", "fedora")]),
//! ]);
//! ```

mod mock_processor;
mod mock_source;

pub use mock_processor::MockProcessor;
pub use mock_source::MockSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Map, Value};

    use crate::resource::ResourceObject;

    /// Create a KubeVirt VirtualMachine with the given labels.
    pub fn vm(name: &str, namespace: &str, labels: &[(&str, &str)]) -> ResourceObject {
        let labels: Map<String, Value> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();

        let value = json!({
            "apiVersion": "kubevirt.io/v1",
            "kind": "VirtualMachine",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "labels": labels,
                "resourceVersion": "4242",
                "managedFields": [
                    {
                        "apiVersion": "kubevirt.io/v1",
                        "fieldsType": "FieldsV1",
                        "manager": "kubectl-create",
                        "operation": "Update"
                    }
                ]
            },
            "spec": {
                "running": false,
                "template": {
                    "spec": {
                        "domain": {
                            "devices": {},
                            "resources": { "requests": { "memory": "1Gi" } }
                        }
                    }
                }
            }
        });

        ResourceObject::from_value(value).unwrap_or_default()
    }

    /// Create `count` label-less VMs named `1..=count` in `namespace`.
    pub fn numbered_vms(count: usize, namespace: &str) -> Vec<ResourceObject> {
        (1..=count)
            .map(|i| vm(&i.to_string(), namespace, &[]))
            .collect()
    }
}
