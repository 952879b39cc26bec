//! Trait definitions for the source module.

use async_trait::async_trait;

use super::error::SourceError;
use crate::resource::ResourceObject;

/// Produces the complete, ordered list of objects to export.
///
/// The listing is all-or-nothing: an error means no object is exported.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Lists every object, fully materialized.
    async fn list(&self) -> Result<Vec<ResourceObject>, SourceError>;
}
