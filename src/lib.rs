//! Weft - dependency resolution for Python monorepos
//!
//! This crate provides the core library functionality for Weft: target
//! discovery, import scanning, dependency resolution and the dependency
//! graph queries that build-file generation runs on.

pub mod core;
pub mod ops;
pub mod resolver;
pub mod scanner;
pub mod util;

/// Test utilities for Weft unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It lays out throwaway monorepos on disk.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    package_config::PackageConfig, registry::TargetRegistry, requirement::ImportMap,
    target::Target, target::TargetKind,
};

pub use resolver::{DependencyGraph, GraphError, RegistrationError};
pub use util::context::PassContext;
