//! Per-kind dependency behaviour.
//!
//! Every target answers the same three questions: which files to scan, what
//! an import name resolves to, and how dependers refer to it. The answers are
//! picked by matching on [`TargetKind`].

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::core::{Target, TargetKind};
use crate::core::registry::RegistryIndex;
use crate::resolver::errors::RegistrationError;
use crate::scanner::ScanUnit;
use crate::util::fs::{glob_dirs, python_files};

/// Worker references embedded in a project manifest: `spec="module.path:ClassName"`.
static WORKER_SPEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bspec\s*=\s*["']([A-Za-z_][A-Za-z0-9_.]*):([A-Za-z_][A-Za-z0-9_]*)["']"#)
        .expect("worker spec regex is valid")
});

/// What an import name or structural reference points at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
    /// A registered first-party target, by key
    Target(String),

    /// A third-party requirement, by requirement name
    Requirement(String),
}

impl Target {
    /// Files whose imports feed this target's dependencies.
    pub fn files_to_scan(
        &self,
        ignore_dirs: &BTreeSet<String>,
    ) -> Result<Vec<ScanUnit>, RegistrationError> {
        if !self.kind().scans_imports() {
            return Ok(Vec::new());
        }
        let Some(package_path) = self.package_path() else {
            return Ok(Vec::new());
        };
        if !package_path.is_dir() {
            return Ok(Vec::new());
        }

        let files = python_files(package_path, ignore_dirs)
            .map_err(|e| RegistrationError::io(package_path, e))?;
        Ok(files
            .into_iter()
            .map(|path| ScanUnit::new(self.key(), path))
            .collect())
    }

    /// Map one scanned import name to a dependency, or `None` to skip it.
    ///
    /// Package names of registered code targets win over the import map.
    /// An import of the target's own package never produces an edge.
    pub fn resolve_dependency(
        &self,
        import_name: &str,
        index: &RegistryIndex<'_>,
    ) -> Option<Resolution> {
        if !self.kind().scans_imports() {
            return None;
        }

        if let Some(key) = index.package_key(import_name) {
            if key == self.key() {
                return None;
            }
            return Some(Resolution::Target(key.to_string()));
        }

        index
            .requirement_for(import_name)
            .map(|requirement| Resolution::Requirement(requirement.to_string()))
    }

    /// Dependencies that come from layout and declarations rather than imports.
    ///
    /// Runs once every import-based edge exists. Aggregate projects wire
    /// their task packages and manifest worker references here; any kind
    /// wires its declared dependencies.
    pub fn derive_structural_dependencies(
        &self,
        index: &RegistryIndex<'_>,
    ) -> Result<Vec<Resolution>, RegistrationError> {
        let mut resolved = Vec::new();

        if self.kind() == TargetKind::AggregateProject {
            resolved.extend(self.project_dependencies(index)?);
        }

        for key in self.declared_dependencies() {
            if index.contains(key) {
                resolved.push(Resolution::Target(key.clone()));
            } else {
                tracing::warn!(
                    "{} declares a dependency on unknown target {}",
                    self.key(),
                    key
                );
            }
        }

        resolved.retain(|r| !matches!(r, Resolution::Target(key) if key == self.key()));
        Ok(resolved)
    }

    fn project_dependencies(
        &self,
        index: &RegistryIndex<'_>,
    ) -> Result<Vec<Resolution>, RegistrationError> {
        let manifest = match self.manifest() {
            Some(path) if path.is_file() => path,
            Some(path) => {
                return Err(RegistrationError::MissingManifest {
                    target: self.key().to_string(),
                    path: path.to_path_buf(),
                })
            }
            None => {
                return Err(RegistrationError::MissingManifest {
                    target: self.key().to_string(),
                    path: self.package_dir().to_path_buf(),
                })
            }
        };

        let mut resolved = Vec::new();

        let task_packages = glob_dirs(self.package_dir(), "tasks/*/src/*")
            .map_err(|e| RegistrationError::io(self.package_dir(), e))?;
        for task_package in task_packages {
            let Some(name) = task_package.file_name().map(|n| n.to_string_lossy()) else {
                continue;
            };
            if let Some(key) = index.package_key(&name) {
                tracing::debug!("{} depends on task package {}", self.key(), key);
                resolved.push(Resolution::Target(key.to_string()));
            }
        }

        let contents =
            std::fs::read_to_string(manifest).map_err(|e| RegistrationError::io(manifest, e))?;
        for caps in WORKER_SPEC_RE.captures_iter(&contents) {
            let module = &caps[1];
            let package_name = module.split('.').next().unwrap_or(module);
            match index.package_key(package_name) {
                Some(key) => {
                    tracing::debug!("{} depends on worker package {}", self.key(), key);
                    resolved.push(Resolution::Target(key.to_string()));
                }
                None => tracing::debug!(
                    "{}: worker `{}` is not a registered package",
                    self.key(),
                    &caps[0]
                ),
            }
        }

        Ok(resolved)
    }

    /// How another target refers to this one when depending on it.
    ///
    /// Runnable kinds are never depended on directly; dependers point at the
    /// library sub-target backing them instead.
    pub fn dependency_descriptor(&self) -> String {
        if self.kind().is_runnable() {
            format!("{}:lib", self.key())
        } else {
            self.key().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::package_config::PackageConfig;
    use crate::core::registry::TargetRegistry;
    use crate::core::requirement::ImportMap;
    use crate::core::target::{test_location, TargetLocation};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn registry_with(names: &[&str]) -> TargetRegistry {
        let mut registry = TargetRegistry::new("3rdparty/python");
        for name in names {
            registry
                .insert(Target::library(
                    test_location(Path::new("/repo"), "lib", name),
                    PackageConfig::default(),
                ))
                .unwrap();
        }
        registry
    }

    fn project(dir: &Path) -> Target {
        let location = TargetLocation {
            source_root: "stepfunctions/projects".to_string(),
            package_dir: dir.to_path_buf(),
            package_path: None,
            package_name: "stepfunctions/projects/etl".to_string(),
            build_dir: "stepfunctions/projects/etl".to_string(),
        };
        Target::project(location, dir.join("project.sfn"), PackageConfig::default())
    }

    #[test]
    fn test_resolve_package_then_import_map() {
        let registry = registry_with(&["pkg_a", "pkg_b"]);
        let mut import_map = ImportMap::new();
        import_map.insert("requests", "requests");
        let index = registry.index(&import_map);
        let pkg_a = registry.get("lib/pkg_a/src").unwrap();

        assert_eq!(
            pkg_a.resolve_dependency("pkg_b", &index),
            Some(Resolution::Target("lib/pkg_b/src".to_string()))
        );
        assert_eq!(
            pkg_a.resolve_dependency("requests", &index),
            Some(Resolution::Requirement("requests".to_string()))
        );
        assert_eq!(pkg_a.resolve_dependency("os", &index), None);
        assert_eq!(pkg_a.resolve_dependency("pkg_a", &index), None);
    }

    #[test]
    fn test_project_ignores_imports() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&["workers"]);
        let import_map = ImportMap::new();
        let project = project(tmp.path());

        assert_eq!(
            project.resolve_dependency("workers", &registry.index(&import_map)),
            None
        );
        assert!(project.files_to_scan(&BTreeSet::new()).unwrap().is_empty());
    }

    #[test]
    fn test_project_worker_reference() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("project.sfn"),
            r#"task = Task(spec="workers.foo:Handler")
other = Task(spec='unregistered.mod:Thing')
"#,
        )
        .unwrap();
        let registry = registry_with(&["workers"]);
        let import_map = ImportMap::new();

        let resolved = project(tmp.path())
            .derive_structural_dependencies(&registry.index(&import_map))
            .unwrap();
        assert_eq!(
            resolved,
            vec![Resolution::Target("lib/workers/src".to_string())]
        );
    }

    #[test]
    fn test_project_task_packages() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("project.sfn"), "").unwrap();
        fs::create_dir_all(tmp.path().join("tasks/extract/src/extractor")).unwrap();
        fs::create_dir_all(tmp.path().join("tasks/load/src/unknown")).unwrap();
        let registry = registry_with(&["extractor"]);
        let import_map = ImportMap::new();

        let resolved = project(tmp.path())
            .derive_structural_dependencies(&registry.index(&import_map))
            .unwrap();
        assert_eq!(
            resolved,
            vec![Resolution::Target("lib/extractor/src".to_string())]
        );
    }

    #[test]
    fn test_project_missing_manifest() {
        let tmp = TempDir::new().unwrap();
        let registry = registry_with(&[]);
        let import_map = ImportMap::new();

        let err = project(tmp.path())
            .derive_structural_dependencies(&registry.index(&import_map))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingManifest { .. }));
    }

    #[test]
    fn test_declared_dependencies_wired_when_registered() {
        let registry = registry_with(&["core"]);
        let import_map = ImportMap::new();
        let target = Target::library(
            test_location(Path::new("/repo"), "tools", "codegen"),
            PackageConfig::default(),
        )
        .with_declared_dependencies(["lib/core/src", "lib/missing/src"]);

        let resolved = target
            .derive_structural_dependencies(&registry.index(&import_map))
            .unwrap();
        assert_eq!(resolved, vec![Resolution::Target("lib/core/src".to_string())]);
    }

    #[test]
    fn test_dependency_descriptor_for_runnable_kinds() {
        let root = Path::new("/repo");
        let library = Target::library(test_location(root, "lib", "core"), PackageConfig::default());
        let binary = Target::binary(test_location(root, "apps", "svc_a"), PackageConfig::default());
        let lambda = Target::lambda(test_location(root, "apps", "fn"), PackageConfig::default());
        let migration =
            Target::migration(test_location(root, "apps", "db"), PackageConfig::default());

        assert_eq!(library.dependency_descriptor(), "lib/core/src");
        assert_eq!(binary.dependency_descriptor(), "apps/svc_a/src:lib");
        assert_eq!(lambda.dependency_descriptor(), "apps/fn/src:lib");
        assert_eq!(migration.dependency_descriptor(), "apps/db/src:lib");
        assert_eq!(
            Target::requirement("3rdparty/python", "requests").dependency_descriptor(),
            "3rdparty/python:requests"
        );
    }

    #[test]
    fn test_files_to_scan_lists_package_sources() {
        let tmp = TempDir::new().unwrap();
        let location = test_location(tmp.path(), "lib", "core");
        let package_path = location.package_path.clone().unwrap();
        fs::create_dir_all(package_path.join("sub")).unwrap();
        fs::write(package_path.join("__init__.py"), "").unwrap();
        fs::write(package_path.join("sub").join("mod.py"), "").unwrap();

        let target = Target::library(location, PackageConfig::default());
        let units = target.files_to_scan(&BTreeSet::new()).unwrap();

        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.owner == "lib/core/src"));
    }
}
