//! Image metadata lookup
//!
//! Containers that do not declare an entry point or command inherit them
//! from their image. A provider supplies those defaults so recipes can
//! wrap them; fetching them from a registry is left to implementors.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entry point and command baked into an image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Image entry point
    #[serde(default)]
    pub entry_point: Option<Vec<String>>,
    /// Image command
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// Metadata lookup failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no metadata for image {image}: {reason}")]
pub struct MetadataError {
    /// Requested image
    pub image: String,
    /// Why the lookup failed
    pub reason: String,
}

impl MetadataError {
    /// Create error
    pub fn new(image: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            reason: reason.into(),
        }
    }
}

/// Source of image metadata
pub trait ImageMetadataProvider: Send + Sync {
    /// Look up metadata of `image`
    ///
    /// # Errors
    /// Returns error if the metadata is not available
    fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError>;
}

impl ImageMetadataProvider for HashMap<String, ImageMetadata> {
    fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        self.get(image)
            .cloned()
            .ok_or_else(|| MetadataError::new(image, "unknown image"))
    }
}

impl ImageMetadataProvider for IndexMap<String, ImageMetadata> {
    fn image_metadata(&self, image: &str) -> Result<ImageMetadata, MetadataError> {
        self.get(image)
            .cloned()
            .ok_or_else(|| MetadataError::new(image, "unknown image"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_provider() {
        let mut images = IndexMap::new();
        images.insert(
            "busybox".to_string(),
            ImageMetadata {
                entry_point: None,
                command: Some(vec!["sh".into()]),
            },
        );
        assert_eq!(
            images.image_metadata("busybox").unwrap().command,
            Some(vec!["sh".to_string()])
        );
        assert_eq!(
            images.image_metadata("nginx").unwrap_err(),
            MetadataError::new("nginx", "unknown image")
        );
    }

    #[test]
    fn metadata_deserializes_with_missing_fields() {
        let metadata: ImageMetadata = serde_json::from_str(r#"{"command": ["/app"]}"#).unwrap();
        assert_eq!(metadata.entry_point, None);
        assert_eq!(metadata.command, Some(vec!["/app".to_string()]));
    }
}
