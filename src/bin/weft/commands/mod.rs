//! Command implementations

pub mod check;
pub mod deps;
pub mod describe;
pub mod import_map;
pub mod targets;

use std::path::PathBuf;

use anyhow::Result;

use weft::ops::{extra_targets, register_all, Registration};
use weft::util::diagnostic::emit;
use weft::PassContext;

/// Options shared by every command.
pub struct Session {
    root: PathBuf,
    color: bool,
}

impl Session {
    pub fn new(root: PathBuf, color: bool) -> Self {
        Session { root, color }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Load the pass context for the repository.
    pub fn context(&self) -> Result<PassContext> {
        PassContext::load(&self.root)
    }

    /// Run a registration pass with `[[extra_targets]]` injected, reporting
    /// unscannable files as warnings.
    pub fn register(&self, ctx: &PassContext) -> Result<Registration> {
        let registration = register_all(ctx, Some(&extra_targets))?;
        for failure in &registration.scan_failures {
            emit(&failure.to_diagnostic(), self.color);
        }
        Ok(registration)
    }
}
