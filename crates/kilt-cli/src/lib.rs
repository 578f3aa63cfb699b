//! Kilt command line
//!
//! Patches CloudFormation templates on disk and evaluates recipes against
//! single container definitions.
//!
//! # Core Concepts
//!
//! - `kilt patch`: reads a template, instruments its task definitions and
//!   writes the result to a file or stdout
//! - `kilt evaluate`: prints the build specification a recipe produces
//!   for one container
//!
//! Every `patch` option can also come from a `KILT_*` environment variable.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod cli;
mod commands;
pub mod logging;

pub use cli::build_cli;
pub use commands::{patcher_config, run};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
