//! Core data structures for Weft.
//!
//! This module contains the foundational types used throughout Weft:
//! - Targets and their per-kind behaviour
//! - The target registry and its lookup index
//! - Per-package configuration
//! - Third-party requirements and the import map

pub mod package_config;
pub mod registry;
pub mod requirement;
pub mod target;

pub use package_config::PackageConfig;
pub use registry::{RegistryIndex, TargetRegistry};
pub use requirement::{ImportMap, RequirementSpec};
pub use target::{Resolution, Target, TargetKind, TargetLocation, TestCategory};
