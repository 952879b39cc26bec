//! Classification of virtual machines into output categories.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::resource::ResourceObject;

/// Label-name prefix that marks a VM as created from a template.
pub const TEMPLATE_LABEL_PREFIX: &str = "vm.kubevirt.io/template";

/// Output subdirectory a VM is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// No template label.
    Custom,
    /// Carries at least one label starting with [`TEMPLATE_LABEL_PREFIX`].
    TemplateBased,
}

impl Category {
    /// Directory name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::TemplateBased => "template-based",
        }
    }

    /// Classifies by label names. The first prefixed name decides; values
    /// and any further prefixed labels are not looked at.
    pub fn from_label_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .find(|name| name.starts_with(TEMPLATE_LABEL_PREFIX))
            .map(|_| Self::TemplateBased)
            .unwrap_or(Self::Custom)
    }

    /// Classifies an object by its `metadata.labels`.
    pub fn of(object: &ResourceObject) -> Self {
        Self::from_label_names(object.labels().into_keys())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
