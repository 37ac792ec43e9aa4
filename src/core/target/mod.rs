//! Target definitions - what gets resolved and described.
//!
//! A Target represents one buildable unit of the monorepo: a code package
//! (library, binary, lambda, migration), a test suite, an aggregate project,
//! or a third-party requirement.

mod core;
mod descriptor;
mod entry_point;
mod resolution;

pub use self::core::{
    requirement_key, Target, TargetKind, TargetLocation, TestCategory, TestRunner, TestScope,
};
pub use self::descriptor::{sort_dependencies, DescriptorBlock, DescriptorField, FieldValue};
pub use self::entry_point::ConsoleScript;
pub use self::resolution::Resolution;

#[cfg(test)]
pub(crate) use self::core::test_location;
