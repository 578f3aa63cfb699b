//! Patch reports

use serde::{Deserialize, Serialize};

/// Container skipped because patching it failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFailure {
    /// Container name
    pub container: String,
    /// Failure message
    pub reason: String,
}

/// Outcome for one task definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReport {
    /// Logical resource name
    pub resource: String,
    /// Patched containers
    pub patched: Vec<String>,
    /// Containers not selected by the opt tags
    pub skipped: Vec<String>,
    /// Containers left untouched after a failure
    pub failed: Vec<ContainerFailure>,
    /// Sidecars appended to the container list
    pub sidecars: Vec<String>,
    /// Process namespace mode set on the task
    pub pid_mode: Option<String>,
}

impl ResourceReport {
    pub(crate) fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }
}

/// Outcome for a whole template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    /// Task definitions visited
    pub resources: Vec<ResourceReport>,
    /// Task definitions left alone because of the ignore tag
    pub ignored: Vec<String>,
    /// Parameters added to the template
    pub parameters: Vec<String>,
}

impl PatchReport {
    /// Total number of patched containers
    #[must_use]
    pub fn patched_containers(&self) -> usize {
        self.resources.iter().map(|r| r.patched.len()).sum()
    }

    /// Report of a resource
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.resource == name)
    }
}
