//! Console script discovery for runnable packages.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::core::Target;
use crate::resolver::errors::RegistrationError;

static CONSOLE_SCRIPTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']console_scripts["']\s*:\s*[\[(]\s*["']([^"']+)["']"#)
        .expect("console_scripts regex is valid")
});

/// The first `console_scripts` entry of a package, e.g. `mybin = my_pkg.cli:main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleScript {
    /// Binary name, `mybin`
    pub name: String,
    /// Dotted module path, `my_pkg.cli`
    pub module: String,
    /// Callable inside the module, `main`
    pub function: Option<String>,
}

impl ConsoleScript {
    /// Parse the first console script declared in `setup.py` source.
    pub fn parse(setup_py: &str) -> Option<Self> {
        let caps = CONSOLE_SCRIPTS_RE.captures(setup_py)?;
        let (name, entry_point) = caps[1].split_once('=')?;
        let name = name.trim();
        let entry_point = entry_point.trim();
        if name.is_empty() || entry_point.is_empty() {
            return None;
        }

        let (module, function) = match entry_point.split_once(':') {
            Some((module, function)) => (module.trim(), Some(function.trim().to_string())),
            None => (entry_point, None),
        };

        Some(ConsoleScript {
            name: name.to_string(),
            module: module.to_string(),
            function,
        })
    }

    /// Source file of the entry module relative to `src/`: `my_pkg/cli.py`.
    pub fn source_path(&self) -> String {
        format!("{}.py", self.module.replace('.', "/"))
    }
}

impl Target {
    /// The console script declared in this package's manifest.
    pub fn console_script(&self, manifest_marker: &str) -> Result<ConsoleScript, RegistrationError> {
        let setup_py = self.package_dir().join(manifest_marker);
        let contents = read_manifest(&setup_py)?;

        let script = ConsoleScript::parse(&contents).ok_or_else(|| {
            RegistrationError::NoConsoleScript {
                target: self.key().to_string(),
                path: setup_py.clone(),
            }
        })?;

        tracing::debug!(
            "Found console script `{}` for {} in {}",
            script.name,
            self.key(),
            setup_py.display()
        );
        Ok(script)
    }
}

fn read_manifest(path: &Path) -> Result<String, RegistrationError> {
    std::fs::read_to_string(path).map_err(|e| RegistrationError::io(path, e))
}
