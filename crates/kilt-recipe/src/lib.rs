//! Kilt recipe evaluation
//!
//! Turns a recipe written in the Kilt configuration language into a
//! neutral [`BuildSpec`] describing how one container must change.
//!
//! # Core Concepts
//!
//! - [`TargetContext`]: what the container looks like before patching,
//!   exposed to recipes as `original.*`
//! - [`Recipe`]: recipe text plus user configuration (`config.*`)
//! - [`BuildSpec`]: image, entry point, command, capabilities,
//!   environment and sidecars to apply
//! - [`Override`]: inherit, replace, or explicitly clear a list field
//!
//! # Recipe keys
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `build.image` | replacement image |
//! | `build.entry_point`, `build.command` | replacement lists |
//! | `build.capabilities` | Linux capabilities to add |
//! | `build.environment_variables` | environment to set |
//! | `build.mount` | sidecars: `name`, `image`, `volumes`, `entry_point`, `environment_variables` |
//! | `task.pid_mode` | process namespace mode of the task |

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod context;
mod error;
mod evaluator;
mod spec;

pub use context::TargetContext;
pub use error::{RecipeError, RecipeResult};
pub use evaluator::{evaluate, render, Recipe};
pub use spec::{BuildSpec, EnvPair, Override, SidecarSpec, TaskSpec};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
