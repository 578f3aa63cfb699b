//! Neutral build specification produced by recipe evaluation

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Replacement policy for a list-valued container field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Override<T> {
    /// Leave the container field untouched
    Inherit,
    /// Replace the field
    Explicit(T),
    /// Recipe set the field to an empty list
    ExplicitEmpty,
}

impl<T> Default for Override<T> {
    fn default() -> Self {
        Self::Inherit
    }
}

impl<T> Override<T> {
    /// Check if the field is left untouched
    #[inline]
    #[must_use]
    pub fn is_inherit(&self) -> bool {
        matches!(self, Self::Inherit)
    }
}

impl<T> Override<Vec<T>> {
    /// Classify an optional list: absent inherits, empty is explicit
    #[must_use]
    pub fn from_list(list: Option<Vec<T>>) -> Self {
        match list {
            None => Self::Inherit,
            Some(items) if items.is_empty() => Self::ExplicitEmpty,
            Some(items) => Self::Explicit(items),
        }
    }

    /// Value to write into the container, `None` when inherited
    #[must_use]
    pub fn into_option(self) -> Option<Vec<T>> {
        match self {
            Self::Inherit => None,
            Self::Explicit(items) => Some(items),
            Self::ExplicitEmpty => Some(Vec::new()),
        }
    }

    /// Borrowed view of the replacement list
    #[must_use]
    pub fn as_slice(&self) -> Option<&[T]> {
        match self {
            Self::Inherit => None,
            Self::Explicit(items) => Some(items),
            Self::ExplicitEmpty => Some(&[]),
        }
    }
}

/// Environment variable entry of a sidecar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvPair {
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

impl EnvPair {
    /// Create pair
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Auxiliary container attached next to the instrumented one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarSpec {
    /// Container name
    pub name: String,
    /// Container image
    pub image: String,
    /// Paths shared with the instrumented container, possibly none
    pub volumes: Vec<String>,
    /// Entry point, never empty
    pub entry_point: Vec<String>,
    /// Explicit environment, sorted by name
    pub environment: Vec<EnvPair>,
}

/// Task-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Process namespace mode shared by the task's containers
    pub pid_mode: Option<String>,
}

/// Modifications to apply to one container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Replacement image, `None` keeps the container's image
    pub image: Option<String>,
    /// Entry point replacement policy
    pub entry_point: Override<Vec<String>>,
    /// Command replacement policy
    pub command: Override<Vec<String>>,
    /// Linux capabilities to add
    pub capabilities: IndexSet<String>,
    /// Environment variables to set, sorted by name
    pub environment: IndexMap<String, String>,
    /// Sidecars to attach, in recipe order
    pub sidecars: Vec<SidecarSpec>,
    /// Task-level settings
    pub task: TaskSpec,
}

impl BuildSpec {
    /// Names of all sidecars
    pub fn sidecar_names(&self) -> impl Iterator<Item = &str> {
        self.sidecars.iter().map(|sidecar| sidecar.name.as_str())
    }
}
