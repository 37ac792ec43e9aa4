//! Per-package `.weft.toml` settings.
//!
//! A package directory may carry a `.weft.toml` next to its `setup.py` to pick
//! a target kind and tune the generated descriptor. A missing file means
//! "library with defaults".

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::resolver::errors::RegistrationError;

/// Name of the per-package configuration file.
pub const PACKAGE_CONFIG_NAME: &str = ".weft.toml";

/// Settings for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Target kind name; `None` means library
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Whether a descriptor is generated at all
    pub generate_build_file: bool,

    /// Dependencies appended verbatim to every dependency list
    pub extra_dependencies: Vec<String>,

    /// Tags added to the standard set
    pub extra_tags: Vec<String>,

    /// Whether binaries may run from a zip
    pub zip_safe: bool,

    /// Emit a `local` binary running `<pkg>/local.py`
    pub generate_local_binary: bool,

    /// Emit a `pytest` wrapper next to `unittest` for test suites
    pub generate_pytest_binary: bool,

    /// Space-separated resource globs
    pub resource_glob_path: Option<String>,

    /// Name used for a test suite's library block
    pub rendered_name: Option<String>,

    /// Lambda runtime override
    pub python_runtime: Option<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        PackageConfig {
            kind: None,
            generate_build_file: true,
            extra_dependencies: Vec::new(),
            extra_tags: Vec::new(),
            zip_safe: true,
            generate_local_binary: false,
            generate_pytest_binary: false,
            resource_glob_path: None,
            rendered_name: None,
            python_runtime: None,
        }
    }
}

impl PackageConfig {
    /// Load settings from a `.weft.toml` file.
    pub fn load(path: &Path) -> Result<Self, RegistrationError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| RegistrationError::io(path, e))?;

        toml::from_str(&contents).map_err(|e| RegistrationError::InvalidPackageConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the settings for a package directory, defaulting when absent.
    pub fn for_package(package_dir: &Path) -> Result<Self, RegistrationError> {
        let path = package_dir.join(PACKAGE_CONFIG_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resource globs, split on whitespace.
    pub fn resource_globs(&self) -> Vec<String> {
        self.resource_glob_path
            .as_deref()
            .map(|globs| globs.split_whitespace().map(String::from).collect())
            .unwrap_or_default()
    }
}
