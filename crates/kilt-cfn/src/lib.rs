//! Kilt for CloudFormation
//!
//! Instruments the containers of `AWS::ECS::TaskDefinition` resources.
//!
//! # Core Concepts
//!
//! - [`PatcherConfig`]: recipe, selection mode and sidecar settings
//! - [`TemplatePatcher`]: walks a template, evaluates the recipe for every
//!   selected container and applies it
//! - [`ImageMetadataProvider`]: optional source of image entry points and commands
//! - [`PatchReport`]: what was patched, skipped or failed
//!
//! # Failure policy
//!
//! Malformed recipe text aborts the resource. Any other failure skips the
//! container and leaves it untouched; a resource fails when none of its
//! selected containers could be patched.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod config;
mod context;
mod error;
mod metadata;
mod patcher;
mod report;

pub use config::{log_configuration, PatcherConfig, SidecarSettings};
pub use context::{resolve_image, ParameterValues};
pub use error::{PatcherError, PatcherResult};
pub use metadata::{ImageMetadata, ImageMetadataProvider, MetadataError};
pub use patcher::{TemplatePatcher, TASK_DEFINITION_TYPE};
pub use report::{ContainerFailure, PatchReport, ResourceReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
