//! Core target types.
//!
//! This module contains the main Target struct and the kind tag that
//! selects its behaviour during scanning, resolution and description.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::package_config::PackageConfig;

/// The kind of build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Importable library package
    Library,

    /// Test suite for a code package
    TestSuite,

    /// CLI or server with a console script entry point
    Binary,

    /// Lambda function package
    Lambda,

    /// Database migration bundle
    Migration,

    /// Multi-task workflow bundle
    AggregateProject,

    /// Third-party requirement
    Requirement,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Library => "library",
            TargetKind::TestSuite => "test",
            TargetKind::Binary => "binary",
            TargetKind::Lambda => "lambda",
            TargetKind::Migration => "migration",
            TargetKind::AggregateProject => "project",
            TargetKind::Requirement => "requirement",
        }
    }

    /// Runnable kinds are depended on through their `:lib` sub-target.
    pub fn is_runnable(&self) -> bool {
        matches!(
            self,
            TargetKind::Binary | TargetKind::Lambda | TargetKind::Migration
        )
    }

    /// Whether dependencies come from scanning the target's own source files.
    pub fn scans_imports(&self) -> bool {
        !matches!(
            self,
            TargetKind::AggregateProject | TargetKind::Requirement
        )
    }

    /// Kinds a package directory with a manifest marker can be registered as.
    pub fn is_code(&self) -> bool {
        matches!(
            self,
            TargetKind::Library | TargetKind::Binary | TargetKind::Lambda | TargetKind::Migration
        )
    }

    /// Ecosystem category used as a tag.
    pub fn category(&self) -> &'static str {
        match self {
            TargetKind::TestSuite => "tests",
            TargetKind::AggregateProject => "project",
            TargetKind::Requirement => "3rdparty",
            _ => "code",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test directory categories looked up under `<package>/tests/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Unit,
    Functional,
    Component,
}

impl TestCategory {
    pub const ALL: [TestCategory; 3] = [
        TestCategory::Unit,
        TestCategory::Functional,
        TestCategory::Component,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Unit => "unit",
            TestCategory::Functional => "functional",
            TestCategory::Component => "component",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a target lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    /// Top-level source root the target was found under, e.g. `lib`
    pub source_root: String,

    /// Package directory, e.g. `<repo>/lib/python_core`
    pub package_dir: PathBuf,

    /// Directory scanned for imports, e.g. `<repo>/lib/python_core/src/core`
    pub package_path: Option<PathBuf>,

    /// Import name other targets resolve to, e.g. `core`
    pub package_name: String,

    /// Repository-relative descriptor directory; doubles as the key
    pub build_dir: String,
}

/// How a test suite's tests are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestRunner {
    Unittest,
    Behave,
}

/// The package a test suite covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestScope {
    /// Package name of the owning code target
    pub package_name: String,
    pub category: TestCategory,
    pub runner: TestRunner,
}

/// A single build target.
///
/// Equality, hashing and ordering look at the key alone.
#[derive(Debug, Clone)]
pub struct Target {
    key: String,
    kind: TargetKind,
    location: TargetLocation,
    tags: BTreeSet<String>,
    config: PackageConfig,

    /// Resolved dependency keys, filled in by the resolver
    dependencies: BTreeSet<String>,

    /// Keys declared up front, wired during structural resolution
    declared_dependencies: Vec<String>,

    /// Owning code package for test suites
    test_scope: Option<TestScope>,

    /// Manifest of an aggregate project
    manifest: Option<PathBuf>,
}

impl Target {
    fn new(kind: TargetKind, location: TargetLocation, config: PackageConfig) -> Self {
        let mut tags = BTreeSet::new();
        tags.insert("python".to_string());
        tags.insert(kind.category().to_string());
        if !location.source_root.is_empty() {
            tags.insert(location.source_root.clone());
        }
        tags.extend(config.extra_tags.iter().cloned());

        Target {
            key: location.build_dir.clone(),
            kind,
            location,
            tags,
            config,
            dependencies: BTreeSet::new(),
            declared_dependencies: Vec::new(),
            test_scope: None,
            manifest: None,
        }
    }

    /// Create a library target.
    pub fn library(location: TargetLocation, config: PackageConfig) -> Self {
        Self::new(TargetKind::Library, location, config)
    }

    /// Create a binary target.
    pub fn binary(location: TargetLocation, config: PackageConfig) -> Self {
        Self::new(TargetKind::Binary, location, config)
    }

    /// Create a lambda target.
    pub fn lambda(location: TargetLocation, config: PackageConfig) -> Self {
        Self::new(TargetKind::Lambda, location, config)
    }

    /// Create a migration target.
    pub fn migration(location: TargetLocation, config: PackageConfig) -> Self {
        Self::new(TargetKind::Migration, location, config)
    }

    /// Create a test suite covering `package_name`.
    pub fn test_suite(
        location: TargetLocation,
        category: TestCategory,
        package_name: impl Into<String>,
        config: PackageConfig,
    ) -> Self {
        let mut target = Self::new(TargetKind::TestSuite, location, config);
        target.tags.insert(category.as_str().to_string());
        target.test_scope = Some(TestScope {
            package_name: package_name.into(),
            category,
            runner: TestRunner::Unittest,
        });
        target
    }

    /// Create a behave feature suite from a standalone package.
    ///
    /// The suite covers itself; it is never indexed for import resolution.
    pub fn behave_suite(location: TargetLocation, config: PackageConfig) -> Self {
        let package_name = location.package_name.clone();
        let mut target = Self::new(TargetKind::TestSuite, location, config);
        target.tags.insert(TestCategory::Functional.as_str().to_string());
        target.test_scope = Some(TestScope {
            package_name,
            category: TestCategory::Functional,
            runner: TestRunner::Behave,
        });
        target
    }

    /// Create an aggregate project whose structure is described by `manifest`.
    pub fn project(location: TargetLocation, manifest: PathBuf, config: PackageConfig) -> Self {
        let mut target = Self::new(TargetKind::AggregateProject, location, config);
        target.manifest = Some(manifest);
        target
    }

    /// Create a third-party requirement pseudo-target.
    pub fn requirement(requirements_dir: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        let location = TargetLocation {
            source_root: requirements_dir.to_string(),
            package_dir: PathBuf::new(),
            package_path: None,
            package_name: name.clone(),
            build_dir: requirements_dir.to_string(),
        };
        let mut target = Self::new(TargetKind::Requirement, location, PackageConfig::default());
        target.key = requirement_key(requirements_dir, &name);
        target
    }

    /// Declare dependency keys to wire during structural resolution.
    pub fn with_declared_dependencies(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.declared_dependencies
            .extend(keys.into_iter().map(Into::into));
        self
    }

    /// Add tags beyond the standard set.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn source_root(&self) -> &str {
        &self.location.source_root
    }

    pub fn package_dir(&self) -> &Path {
        &self.location.package_dir
    }

    pub fn package_path(&self) -> Option<&Path> {
        self.location.package_path.as_deref()
    }

    pub fn package_name(&self) -> &str {
        &self.location.package_name
    }

    pub fn build_dir(&self) -> &str {
        &self.location.build_dir
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn config(&self) -> &PackageConfig {
        &self.config
    }

    /// Resolved dependency keys.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn declared_dependencies(&self) -> &[String] {
        &self.declared_dependencies
    }

    pub fn test_scope(&self) -> Option<&TestScope> {
        self.test_scope.as_ref()
    }

    pub fn manifest(&self) -> Option<&Path> {
        self.manifest.as_deref()
    }

    /// Record a dependency edge. Self edges are refused.
    pub(crate) fn add_dependency(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if key == self.key {
            return false;
        }
        self.dependencies.insert(key)
    }
}

/// Key of the requirement pseudo-target for `name`.
pub fn requirement_key(requirements_dir: &str, name: &str) -> String {
    format!("{}:{}", requirements_dir, name)
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Target {}

impl Hash for Target {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Target {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Target {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
pub(crate) fn test_location(root: &Path, source_root: &str, package_name: &str) -> TargetLocation {
    let package_dir = root.join(source_root).join(package_name);
    TargetLocation {
        source_root: source_root.to_string(),
        package_path: Some(package_dir.join("src").join(package_name)),
        package_dir,
        package_name: package_name.to_string(),
        build_dir: format!("{}/{}/src", source_root, package_name),
    }
}
