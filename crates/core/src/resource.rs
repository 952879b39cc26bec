//! Kubernetes object representation used as the pipeline work item.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A Kubernetes object kept as an untyped JSON document.
///
/// Only the handful of metadata fields the exporter needs are exposed as
/// accessors; everything else round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceObject {
    object: Map<String, Value>,
}

impl ResourceObject {
    /// Wraps an already parsed JSON object.
    pub fn new(object: Map<String, Value>) -> Self {
        Self { object }
    }

    /// Builds an object from a JSON value, returning `None` unless it is a map.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(object) => Some(Self { object }),
            _ => None,
        }
    }

    /// Returns the raw object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.object
    }

    /// Consumes the wrapper and returns the raw object.
    pub fn into_map(self) -> Map<String, Value> {
        self.object
    }

    fn metadata(&self) -> Option<&Map<String, Value>> {
        self.object.get("metadata").and_then(Value::as_object)
    }

    fn metadata_str(&self, key: &str) -> &str {
        self.metadata()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// `metadata.name`, or an empty string when absent.
    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    /// `metadata.namespace`, or an empty string for cluster-scoped objects.
    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    /// `metadata.labels` as name → value. Non-string values are skipped.
    pub fn labels(&self) -> BTreeMap<&str, &str> {
        self.metadata()
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes `metadata.managedFields`. Returns whether anything was removed.
    pub fn strip_managed_fields(&mut self) -> bool {
        self.object
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .map(|m| m.remove("managedFields").is_some())
            .unwrap_or(false)
    }
}

impl From<Map<String, Value>> for ResourceObject {
    fn from(object: Map<String, Value>) -> Self {
        Self::new(object)
    }
}
