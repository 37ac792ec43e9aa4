//! Test utilities for Weft unit tests.
//!
//! [`MonorepoFixture`] lays out a throwaway repository in a temporary
//! directory and hands back a [`PassContext`] over it.
//!
//! # Example
//!
//! ```rust,ignore
//! use weft::test_support::{MonorepoFixture, PackageFixture};
//!
//! #[test]
//! fn test_example() {
//!     let repo = MonorepoFixture::new();
//!     repo.package(PackageFixture::library("pkg_a", &["pkg_b"]));
//!     repo.package(PackageFixture::library("pkg_b", &[]));
//!
//!     let ctx = repo.context();
//!     // Run discovery against ctx...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::requirement::ImportMap;
use crate::util::config::{load_config, PROJECT_CONFIG_NAME};
use crate::util::context::PassContext;

pub use fixtures::*;

/// A monorepo on disk, removed when dropped.
pub struct MonorepoFixture {
    dir: TempDir,
}

impl MonorepoFixture {
    /// Create an empty repository.
    pub fn new() -> Self {
        MonorepoFixture {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Repository root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a code package. Returns its directory.
    pub fn package(&self, fixture: PackageFixture) -> PathBuf {
        fixture
            .write_to(self.root())
            .expect("failed to write package fixture")
    }

    /// Write an aggregate project under the default project root.
    pub fn project(&self, fixture: ProjectFixture) -> PathBuf {
        fixture
            .write_to(&self.root().join("stepfunctions/projects"), "project.sfn")
            .expect("failed to write project fixture")
    }

    /// Write any file, relative to the root.
    pub fn file(&self, path: impl AsRef<Path>, content: &str) -> PathBuf {
        let path = self.root().join(path);
        write_file(&path, content).expect("failed to write fixture file");
        path
    }

    /// Write `weft.toml`.
    pub fn config(&self, content: &str) {
        self.file(PROJECT_CONFIG_NAME, content);
    }

    /// Write the import map at its default location.
    pub fn import_map(&self, entries: &[(&str, &str)]) {
        let map: ImportMap = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let json = serde_json::to_string_pretty(&map).expect("import map serializes");
        self.file("3rdparty/python/import-map.json", &json);
    }

    /// Write `requirements.txt` at its default location.
    pub fn requirements(&self, content: &str) {
        self.file("3rdparty/python/requirements.txt", content);
    }

    /// Context over this repository. The global config is not consulted.
    pub fn context(&self) -> PassContext {
        let config = load_config(None, &self.root().join(PROJECT_CONFIG_NAME))
            .expect("failed to load fixture config");
        let import_map =
            ImportMap::load(&self.root().join(&config.import_map)).expect("bad import map");
        PassContext::new(self.root(), config, import_map).expect("invalid fixture context")
    }
}

impl Default for MonorepoFixture {
    fn default() -> Self {
        Self::new()
    }
}
