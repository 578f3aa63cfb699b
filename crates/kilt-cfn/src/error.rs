//! Template patching errors

use kilt_patch::PatchError;
use kilt_recipe::RecipeError;
use thiserror::Error;

/// Errors raised while patching a template
#[derive(Debug, Error)]
pub enum PatcherError {
    /// Template does not have the expected shape
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Recipe cannot be used for this resource
    #[error("recipe failed for resource {resource}: {source}")]
    Recipe {
        /// Logical name of the resource
        resource: String,
        /// Evaluation failure
        #[source]
        source: RecipeError,
    },

    /// No selected container of the resource could be patched
    #[error("all selected containers of resource {resource} failed, first was {container}: {reason}")]
    ResourceFailed {
        /// Logical name of the resource
        resource: String,
        /// First failing container
        container: String,
        /// Why it failed
        reason: String,
    },

    /// Document mutation outside of a container failed
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Template or parameter text is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PatcherError {
    /// Create an invalid template error
    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate(message.into())
    }

    /// Create a recipe error for a resource
    pub fn recipe(resource: impl Into<String>, source: RecipeError) -> Self {
        Self::Recipe {
            resource: resource.into(),
            source,
        }
    }
}

/// Result type for template patching
pub type PatcherResult<T> = Result<T, PatcherError>;

/// Failure of a single container, recovered by skipping it
#[derive(Debug, Error)]
pub(crate) enum ContainerError {
    #[error(transparent)]
    Recipe(#[from] RecipeError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}
