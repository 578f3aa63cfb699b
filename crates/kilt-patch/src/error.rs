//! Patch errors

use thiserror::Error;

/// Errors raised while mutating a container definition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    /// A field could not be written because of the shape found at `path`
    #[error("cannot patch {path}: {reason}")]
    Application {
        /// Dotted path inside the container definition
        path: String,
        /// What is wrong
        reason: String,
    },
}

impl PatchError {
    /// Create an application error
    pub fn application(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Application {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path the error refers to
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Application { path, .. } => path,
        }
    }
}

/// Result type for patch operations
pub type PatchResult<T> = Result<T, PatchError>;
