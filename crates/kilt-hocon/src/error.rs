//! Error types for configuration parsing and resolution

use crate::path::{ConfigPath, PathError};

/// Errors raised while parsing or resolving a configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HoconError {
    /// Malformed configuration text
    #[error("syntax error in {source_name} at {line}:{column}: {message}")]
    Syntax {
        /// Name of the layer the text came from
        source_name: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Human readable description
        message: String,
    },

    /// A `${path}` substitution did not resolve
    #[error("could not resolve substitution ${{{path}}}")]
    Unresolved {
        /// Referenced path
        path: ConfigPath,
    },

    /// Substitutions reference each other in a loop
    #[error("substitution cycle detected at {path}")]
    Cycle {
        /// Path at which the cycle was detected
        path: ConfigPath,
    },

    /// Concatenation of incompatible value kinds
    #[error("cannot concatenate values at {path}: {message}")]
    Concat {
        /// Path of the concatenated field
        path: ConfigPath,
        /// Human readable description
        message: String,
    },

    /// Invalid path expression
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
}

impl HoconError {
    /// Create syntax error for a source position
    pub fn syntax(
        source_name: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            source_name: source_name.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Check if error comes from malformed text rather than resolution
    #[inline]
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::Path(_))
    }
}

/// Result type alias for configuration operations
pub type HoconResult<T> = Result<T, HoconError>;
