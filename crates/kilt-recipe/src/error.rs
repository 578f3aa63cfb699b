//! Recipe evaluation errors

use kilt_hocon::HoconError;
use thiserror::Error;

/// Errors raised while evaluating a recipe
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecipeError {
    /// Recipe, user configuration or sidecar configuration is malformed
    #[error("configuration syntax error: {0}")]
    ConfigSyntax(#[source] HoconError),

    /// Hard substitution could not be resolved
    #[error("unresolved reference: {path}")]
    UnresolvedReference {
        /// Substitution path
        path: String,
    },

    /// Entry of `build.mount` is incomplete or malformed
    #[error("invalid sidecar at build.mount[{index}]: {reason}")]
    InvalidSidecar {
        /// Position in the mount list
        index: usize,
        /// What is wrong
        reason: String,
    },

    /// Value has the wrong shape
    #[error("invalid value at {path}: {reason}")]
    InvalidValue {
        /// Offending path
        path: String,
        /// What is wrong
        reason: String,
    },
}

impl RecipeError {
    /// Create an invalid sidecar error
    pub fn invalid_sidecar(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSidecar {
            index,
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error comes from malformed text
    #[inline]
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::ConfigSyntax(_))
    }
}

impl From<HoconError> for RecipeError {
    fn from(err: HoconError) -> Self {
        match err {
            HoconError::Unresolved { path } | HoconError::Cycle { path } => {
                Self::UnresolvedReference {
                    path: path.to_string(),
                }
            }
            HoconError::Concat { path, message } => Self::InvalidValue {
                path: path.to_string(),
                reason: message,
            },
            syntax => Self::ConfigSyntax(syntax),
        }
    }
}

/// Result type for recipe evaluation
pub type RecipeResult<T> = Result<T, RecipeError>;
