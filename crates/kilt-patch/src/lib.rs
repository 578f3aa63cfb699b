//! Kilt container patching
//!
//! Applies a [`BuildSpec`](kilt_recipe::BuildSpec) to a container
//! definition and decides which containers of a resource are patched.
//!
//! # Core Concepts
//!
//! - [`PatchEngine`]: field-level mutation of one container definition
//! - [`PatchOutcome`]: sidecar definitions and parameter declarations to
//!   insert next to the container
//! - [`parameter_name`]: camel-cased template parameter names
//! - [`OptTags`] and [`should_patch`]: opt-in / opt-out selection
//!
//! # Example
//!
//! ```rust
//! use kilt_patch::{PatchEngine, PatchOptions};
//! use kilt_recipe::{Recipe, TargetContext};
//! use serde_json::json;
//!
//! let mut container = json!({"Name": "app", "Image": "busybox", "Command": ["/app"]});
//! let context = kilt_patch::target_context(&container, "task")?;
//! let spec = Recipe::new(r#"build.entry_point: ["/kilt/run", "--"]"#).evaluate(&context)?;
//! let outcome = PatchEngine::new(PatchOptions::default()).apply(&mut container, &spec)?;
//! assert_eq!(container["EntryPoint"], json!(["/kilt/run", "--"]));
//! assert!(outcome.sidecars.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod container;
pub mod document;
mod engine;
mod error;
mod params;
mod selector;

pub use container::{container_name, target_context};
pub use engine::{PatchEngine, PatchOptions, PatchOutcome};
pub use error::{PatchError, PatchResult};
pub use params::{declaration, is_template_value, parameter_name, reference, PARAMETER_TYPE};
pub use selector::{
    should_patch, OptTags, CONTAINER_LIST_SEPARATOR, IGNORE_CONTAINERS_TAG, IGNORE_TAG,
    INCLUDE_CONTAINERS_TAG, INCLUDE_TAG,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
