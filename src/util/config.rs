//! Configuration file support for Weft.
//!
//! Weft reads two configuration file locations:
//! - Global: `~/.weft/config.toml` - User-wide defaults
//! - Project: `weft.toml` at the repository root - Project settings
//!
//! Project config takes precedence over global config. Both files share one
//! schema in which every key is optional; the merged result is resolved into
//! a [`Config`] with defaults filled in.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the project configuration file.
pub const PROJECT_CONFIG_NAME: &str = "weft.toml";

/// Directories skipped while walking source roots unless configured otherwise.
const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    ".mypy_cache",
    ".pytest_cache",
    ".tox",
    ".venv",
    "__pycache__",
    "node_modules",
];

/// Resolved project configuration used by a registration pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Top-level source roots to walk, relative to the repository root
    pub top_dirs: Vec<String>,

    /// Directory names never descended into
    pub ignore_dirs: BTreeSet<String>,

    /// Target keys dropped during discovery
    pub ignore_targets: BTreeSet<String>,

    /// File whose presence marks a package directory
    pub manifest_marker: String,

    /// Directory holding aggregate projects
    pub project_root: String,

    /// Manifest file name inside each aggregate project
    pub project_manifest: String,

    /// Directory prefix of requirement target keys
    pub requirements_dir: String,

    /// JSON table mapping import names to requirement names
    pub import_map: PathBuf,

    /// requirements.txt used to audit the import map
    pub requirements: PathBuf,

    /// Runtime written into lambda descriptors
    pub default_python_runtime: String,

    /// Number of scan workers (None = cores minus one)
    pub jobs: Option<usize>,

    /// Kind overrides keyed by package name or package directory
    pub kinds: BTreeMap<String, String>,

    /// Extra kind names mapped onto built-in kinds
    pub kind_aliases: BTreeMap<String, String>,

    /// Override targets injected after discovery
    pub extra_targets: Vec<ExtraTarget>,
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default().resolve()
    }
}

impl Config {
    /// Kind override for a package, by package name first and directory second.
    pub fn kind_override(&self, package_name: &str, package_dir: &str) -> Option<&str> {
        self.kinds
            .get(package_name)
            .or_else(|| self.kinds.get(package_dir))
            .map(|s| s.as_str())
    }
}

/// A target declared directly in `weft.toml`.
///
/// These are registered by the CLI's extra-target hook and win over any
/// discovered target with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraTarget {
    /// Target key
    pub key: String,

    /// Kind name (library, binary, lambda, migration or an alias)
    #[serde(default = "default_extra_kind")]
    pub kind: String,

    /// Import name other targets resolve to (defaults to the last key segment)
    #[serde(default)]
    pub package_name: Option<String>,

    /// Package directory relative to the repository root
    #[serde(default)]
    pub path: Option<String>,

    /// Keys of targets this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Extra tags
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_extra_kind() -> String {
    "library".to_string()
}

/// On-disk configuration layer. Every key is optional so layers can merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub top_dirs: Option<Vec<String>>,
    pub ignore_dirs: Option<BTreeSet<String>>,
    pub ignore_targets: Option<BTreeSet<String>>,
    pub manifest_marker: Option<String>,
    pub project_root: Option<String>,
    pub project_manifest: Option<String>,
    pub requirements_dir: Option<String>,
    pub import_map: Option<PathBuf>,
    pub requirements: Option<PathBuf>,
    pub default_python_runtime: Option<String>,
    pub jobs: Option<usize>,
    pub kinds: BTreeMap<String, String>,
    pub kind_aliases: BTreeMap<String, String>,
    pub extra_targets: Vec<ExtraTarget>,
}

impl ConfigFile {
    /// Load a configuration layer from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load a configuration layer with fallback to defaults if the file is absent or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another layer into this one (other takes precedence).
    pub fn merge(&mut self, other: ConfigFile) {
        if other.top_dirs.is_some() {
            self.top_dirs = other.top_dirs;
        }
        if other.ignore_dirs.is_some() {
            self.ignore_dirs = other.ignore_dirs;
        }
        if other.ignore_targets.is_some() {
            self.ignore_targets = other.ignore_targets;
        }
        if other.manifest_marker.is_some() {
            self.manifest_marker = other.manifest_marker;
        }
        if other.project_root.is_some() {
            self.project_root = other.project_root;
        }
        if other.project_manifest.is_some() {
            self.project_manifest = other.project_manifest;
        }
        if other.requirements_dir.is_some() {
            self.requirements_dir = other.requirements_dir;
        }
        if other.import_map.is_some() {
            self.import_map = other.import_map;
        }
        if other.requirements.is_some() {
            self.requirements = other.requirements;
        }
        if other.default_python_runtime.is_some() {
            self.default_python_runtime = other.default_python_runtime;
        }
        if other.jobs.is_some() {
            self.jobs = other.jobs;
        }

        // Tables merge per key; extra targets accumulate
        self.kinds.extend(other.kinds);
        self.kind_aliases.extend(other.kind_aliases);
        self.extra_targets.extend(other.extra_targets);
    }

    /// Fill in defaults for every key left unset.
    pub fn resolve(self) -> Config {
        let requirements_dir = self
            .requirements_dir
            .unwrap_or_else(|| "3rdparty/python".to_string());

        Config {
            top_dirs: self
                .top_dirs
                .unwrap_or_else(|| vec!["lib".to_string(), "apps".to_string()]),
            ignore_dirs: self.ignore_dirs.unwrap_or_else(|| {
                DEFAULT_IGNORE_DIRS.iter().map(|s| s.to_string()).collect()
            }),
            ignore_targets: self.ignore_targets.unwrap_or_default(),
            manifest_marker: self
                .manifest_marker
                .unwrap_or_else(|| "setup.py".to_string()),
            project_root: self
                .project_root
                .unwrap_or_else(|| "stepfunctions/projects".to_string()),
            project_manifest: self
                .project_manifest
                .unwrap_or_else(|| "project.sfn".to_string()),
            import_map: self
                .import_map
                .unwrap_or_else(|| Path::new(&requirements_dir).join("import-map.json")),
            requirements: self
                .requirements
                .unwrap_or_else(|| Path::new(&requirements_dir).join("requirements.txt")),
            requirements_dir,
            default_python_runtime: self
                .default_python_runtime
                .unwrap_or_else(|| "python3.8".to_string()),
            jobs: self.jobs,
            kinds: self.kinds,
            kind_aliases: self.kind_aliases,
            extra_targets: self.extra_targets,
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (weft.toml)
/// 2. Global config (~/.weft/config.toml)
/// 3. Defaults
///
/// A broken global file is skipped with a warning; a broken project file is an error.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config> {
    let mut layer = ConfigFile::default();

    if let Some(global_path) = global_path {
        layer.merge(ConfigFile::load_or_default(global_path));
    }

    if project_path.exists() {
        layer.merge(ConfigFile::load(project_path)?);
    } else {
        tracing::debug!("No project config at {}", project_path.display());
    }

    Ok(layer.resolve())
}

/// Get the global weft config directory (~/.weft).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".weft"))
}

/// Get the global config path (~/.weft/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.top_dirs, vec!["lib", "apps"]);
        assert_eq!(config.manifest_marker, "setup.py");
        assert_eq!(config.requirements_dir, "3rdparty/python");
        assert_eq!(
            config.import_map,
            PathBuf::from("3rdparty/python/import-map.json")
        );
        assert!(config.ignore_dirs.contains("__pycache__"));
        assert!(config.jobs.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(PROJECT_CONFIG_NAME);

        std::fs::write(
            &config_path,
            r#"
top_dirs = ["lib", "services"]
ignore_targets = ["lib/legacy/src"]
jobs = 4

[kinds]
billing = "binary"

[kind_aliases]
service = "binary"

[[extra_targets]]
key = "tools/codegen"
dependencies = ["lib/core/src"]
"#,
        )
        .unwrap();

        let config = load_config(None, &config_path).unwrap();
        assert_eq!(config.top_dirs, vec!["lib", "services"]);
        assert!(config.ignore_targets.contains("lib/legacy/src"));
        assert_eq!(config.jobs, Some(4));
        assert_eq!(config.kind_override("billing", "lib/billing"), Some("binary"));
        assert_eq!(config.kind_aliases.get("service").map(String::as_str), Some("binary"));
        assert_eq!(config.extra_targets.len(), 1);
        assert_eq!(config.extra_targets[0].kind, "library");
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            r#"
jobs = 2
default_python_runtime = "python3.11"
"#,
        )
        .unwrap();
        std::fs::write(&project_path, "jobs = 8\n").unwrap();

        let config = load_config(Some(&global_path), &project_path).unwrap();
        assert_eq!(config.jobs, Some(8));
        assert_eq!(config.default_python_runtime, "python3.11");
    }

    #[test]
    fn test_broken_project_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let project_path = tmp.path().join(PROJECT_CONFIG_NAME);
        std::fs::write(&project_path, "top_dirs = 3").unwrap();

        assert!(load_config(None, &project_path).is_err());
    }

    #[test]
    fn test_kind_override_prefers_package_name() {
        let mut config = Config::default();
        config.kinds.insert("lib/api".to_string(), "lambda".to_string());
        config.kinds.insert("api".to_string(), "binary".to_string());

        assert_eq!(config.kind_override("api", "lib/api"), Some("binary"));
        assert_eq!(config.kind_override("other", "lib/api"), Some("lambda"));
        assert_eq!(config.kind_override("other", "lib/other"), None);
    }
}
