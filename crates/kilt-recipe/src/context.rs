//! Observed properties of the container being instrumented

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Read-only snapshot of one container before patching
///
/// `None` for `image`, `entry_point` or `command` means the container
/// does not declare the field; it is exposed to recipes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetContext {
    /// Container image
    pub image: Option<String>,
    /// Container name
    pub container_name: String,
    /// Enclosing task (group) name
    pub group_name: String,
    /// Entry point as declared by the container
    pub entry_point: Option<Vec<String>>,
    /// Command as declared by the container
    pub command: Option<Vec<String>>,
    /// Environment variables, values kept as found (strings or template references)
    pub environment: IndexMap<String, Value>,
    /// Free-form metadata, e.g. resource tags
    pub metadata: IndexMap<String, String>,
}

impl TargetContext {
    /// Create context for a named container
    #[inline]
    #[must_use]
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            ..Self::default()
        }
    }

    /// Set image
    #[inline]
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set group name
    #[inline]
    #[must_use]
    pub fn with_group_name(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = group_name.into();
        self
    }

    /// Set entry point
    #[must_use]
    pub fn with_entry_point<S: Into<String>>(mut self, entry_point: impl IntoIterator<Item = S>) -> Self {
        self.entry_point = Some(entry_point.into_iter().map(Into::into).collect());
        self
    }

    /// Set command
    #[must_use]
    pub fn with_command<S: Into<String>>(mut self, command: impl IntoIterator<Item = S>) -> Self {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Add an environment variable
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// Add a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Render the reserved `original.*` namespace as a configuration layer
    ///
    /// Every value is written as a JSON literal.
    #[must_use]
    pub fn to_layer(&self) -> String {
        let entries = [
            ("image", json!(self.image)),
            ("container_name", json!(self.container_name)),
            ("container_group_name", json!(self.group_name)),
            ("entry_point", json!(self.entry_point)),
            ("command", json!(self.command)),
            ("environment_variables", json!(self.environment)),
            ("metadata", json!(self.metadata)),
        ];

        let mut layer = String::new();
        for (key, value) in entries {
            layer.push_str("original.");
            layer.push_str(key);
            layer.push_str(": ");
            layer.push_str(&value.to_string());
            layer.push('\n');
        }
        layer
    }
}
