//! Test fixtures for common test scenarios.
//!
//! Package and project fixtures describe one directory of a monorepo and
//! write themselves below a repository root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::target::TestCategory;

/// Fixture for one code package: `<source_root>/<dir>/setup.py` plus a
/// single package under `src/`.
#[derive(Debug, Clone)]
pub struct PackageFixture {
    /// Source root the package lives under (e.g. `lib`).
    pub source_root: String,
    /// Directory name below the source root.
    pub dir: String,
    /// Python package name below `src/`.
    pub name: String,
    /// setup.py content.
    pub setup_py: String,
    /// Package modules (path relative to `src/<name>` -> content).
    pub modules: BTreeMap<PathBuf, String>,
    /// `.weft.toml` content, if any.
    pub package_config: Option<String>,
    /// Test suites (category -> test module content).
    pub tests: BTreeMap<&'static str, String>,
}

impl PackageFixture {
    /// Create a package whose directory matches its package name.
    pub fn new(source_root: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        PackageFixture {
            source_root: source_root.into(),
            dir: name.clone(),
            setup_py: sources::setup_py(&name, None),
            name,
            modules: BTreeMap::new(),
            package_config: None,
            tests: BTreeMap::new(),
        }
    }

    /// A library under `lib/` whose `__init__.py` imports `imports`.
    pub fn library(name: impl Into<String>, imports: &[&str]) -> Self {
        Self::new("lib", name).with_module("__init__.py", sources::imports(imports))
    }

    /// Use a directory name different from the package name.
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Add a module below the package directory.
    pub fn with_module(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.modules.insert(path.into(), content.into());
        self
    }

    /// Set `.weft.toml`.
    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.package_config = Some(config.into());
        self
    }

    /// Register a console script named `script` at `module:function`.
    pub fn with_console_script(mut self, script: &str, entry: &str) -> Self {
        self.setup_py = sources::setup_py(&self.name, Some((script, entry)));
        self
    }

    /// Add a test suite.
    pub fn with_tests(mut self, category: TestCategory, content: impl Into<String>) -> Self {
        self.tests.insert(category.as_str(), content.into());
        self
    }

    /// Repository-relative package directory.
    pub fn package_dir(&self) -> PathBuf {
        Path::new(&self.source_root).join(&self.dir)
    }

    /// Target key the package registers under.
    pub fn key(&self) -> String {
        format!("{}/{}/src", self.source_root, self.dir)
    }

    /// Write this fixture below `root`.
    pub fn write_to(&self, root: &Path) -> std::io::Result<PathBuf> {
        let package_dir = root.join(self.package_dir());
        let package_path = package_dir.join("src").join(&self.name);
        std::fs::create_dir_all(&package_path)?;

        std::fs::write(package_dir.join("setup.py"), &self.setup_py)?;

        if !self.modules.contains_key(Path::new("__init__.py")) {
            std::fs::write(package_path.join("__init__.py"), "")?;
        }
        for (rel_path, content) in &self.modules {
            write_file(&package_path.join(rel_path), content)?;
        }

        if let Some(config) = &self.package_config {
            std::fs::write(package_dir.join(".weft.toml"), config)?;
        }

        for (category, content) in &self.tests {
            let tests_dir = package_dir.join("tests").join(category);
            write_file(&tests_dir.join("__init__.py"), "")?;
            write_file(&tests_dir.join(format!("test_{}.py", self.name)), content)?;
        }

        Ok(package_dir)
    }
}

/// Fixture for an aggregate project under the project root.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Project directory name.
    pub name: String,
    /// Manifest content; `None` leaves the manifest out.
    pub manifest: Option<String>,
    /// Task packages (task dir, package name) -> `__init__.py` content.
    pub tasks: BTreeMap<(String, String), String>,
}

impl ProjectFixture {
    /// Create a project with the given manifest.
    pub fn new(name: impl Into<String>, manifest: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: Some(manifest.into()),
            tasks: BTreeMap::new(),
        }
    }

    /// Create a project with no manifest file.
    pub fn without_manifest(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: None,
            tasks: BTreeMap::new(),
        }
    }

    /// Add `tasks/<task>/src/<package>/__init__.py`.
    pub fn with_task(
        mut self,
        task: impl Into<String>,
        package: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.tasks
            .insert((task.into(), package.into()), content.into());
        self
    }

    /// Write this fixture into `project_root`.
    pub fn write_to(&self, project_root: &Path, manifest_name: &str) -> std::io::Result<PathBuf> {
        let project_dir = project_root.join(&self.name);
        std::fs::create_dir_all(&project_dir)?;

        if let Some(manifest) = &self.manifest {
            std::fs::write(project_dir.join(manifest_name), manifest)?;
        }
        for ((task, package), content) in &self.tasks {
            let path = project_dir
                .join("tasks")
                .join(task)
                .join("src")
                .join(package)
                .join("__init__.py");
            write_file(&path, content)?;
        }

        Ok(project_dir)
    }
}

pub(crate) fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

/// Python sources.
pub mod sources {
    /// One `import` statement per name.
    pub fn imports(names: &[&str]) -> String {
        names.iter().map(|n| format!("import {n}\n")).collect()
    }

    /// A minimal setup.py, optionally declaring one console script.
    pub fn setup_py(name: &str, console_script: Option<(&str, &str)>) -> String {
        let entry_points = match console_script {
            Some((script, entry)) => format!(
                "    entry_points={{\n        \"console_scripts\": [\"{script}={entry}\"],\n    }},\n"
            ),
            None => String::new(),
        };
        format!(
            "from setuptools import find_packages, setup\n\nsetup(\n    name=\"{name}\",\n    packages=find_packages(\"src\"),\n    package_dir={{\"\": \"src\"}},\n{entry_points})\n"
        )
    }

    /// A step function manifest referencing one worker.
    pub fn project_manifest(worker: &str) -> String {
        format!(
            "{{\n  \"StartAt\": \"Run\",\n  \"States\": {{\n    \"Run\": {{\"worker\": {{spec=\"{worker}\"}}}}\n  }}\n}}\n"
        )
    }

    /// Source that does not parse.
    pub fn invalid() -> &'static str {
        "def broken(:\n    pass\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_fixture_layout() {
        let tmp = TempDir::new().unwrap();
        let fixture = PackageFixture::library("pkg_a", &["pkg_b"])
            .with_dir("a")
            .with_config("type = \"binary\"\n")
            .with_tests(TestCategory::Unit, "import pkg_a\n");
        let dir = fixture.write_to(tmp.path()).unwrap();

        assert_eq!(dir, tmp.path().join("lib/a"));
        assert_eq!(fixture.key(), "lib/a/src");
        assert!(dir.join("setup.py").is_file());
        assert!(dir.join(".weft.toml").is_file());
        assert_eq!(
            std::fs::read_to_string(dir.join("src/pkg_a/__init__.py")).unwrap(),
            "import pkg_b\n"
        );
        assert!(dir.join("tests/unit/test_pkg_a.py").is_file());
    }

    #[test]
    fn test_setup_py_console_script() {
        let setup = sources::setup_py("svc", Some(("svc", "svc.main:run")));
        assert!(setup.contains("\"console_scripts\": [\"svc=svc.main:run\"]"));
        assert!(!sources::setup_py("svc", None).contains("console_scripts"));
    }
}
