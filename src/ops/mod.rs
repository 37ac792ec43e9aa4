//! High-level operations.
//!
//! This module contains the implementation of Weft commands.

pub mod describe;
pub mod discover;
pub mod import_map;
pub mod register;

pub use describe::{describe, DescribeOptions, TargetDescriptor};
pub use discover::{discover_targets, register_package};
pub use import_map::audit_import_map;
pub use register::{
    check_cycles, extra_targets, register_all, transitive_dependencies, Registration,
    RegistrationHook, ValidatedRegistration,
};
