//! Third-party requirements and the import map.
//!
//! The import map is a precomputed JSON table from a top-level import name
//! (`yaml`) to the requirement that provides it (`PyYAML`). Resolution only
//! reads it; [`ImportMap::audit`] compares it against `requirements.txt`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::resolver::errors::RegistrationError;

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[([^\]]*)\])?\s*(.*)$")
        .expect("requirement regex is valid")
});

/// One parsed line of `requirements.txt`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequirementSpec {
    /// Project name as published
    pub name: String,
    /// The single supported extra, if any
    pub extra: Option<String>,
}

impl RequirementSpec {
    /// Parse a requirement line.
    ///
    /// Returns `Ok(None)` for blank lines, comments and pip options. At most one
    /// extra is supported; `pkg[a,b]` is rejected.
    pub fn parse(line: &str) -> Result<Option<Self>, RegistrationError> {
        let line = line.split('#').next().unwrap_or("");
        let line = line.split(';').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with('-') {
            return Ok(None);
        }

        let caps = REQUIREMENT_RE
            .captures(line)
            .ok_or_else(|| RegistrationError::InvalidRequirement {
                line: line.to_string(),
            })?;
        let name = caps[1].to_string();

        let extras: Vec<String> = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if extras.len() > 1 {
            return Err(RegistrationError::MultipleRequirementExtras {
                requirement: name,
                extras,
            });
        }

        Ok(Some(RequirementSpec {
            name,
            extra: extras.into_iter().next(),
        }))
    }

    /// Full requirement name including the extra, e.g. `celery[redis]`.
    pub fn requirement_name(&self) -> String {
        match &self.extra {
            Some(extra) => format!("{}[{}]", self.name, extra),
            None => self.name.clone(),
        }
    }
}

/// Parse every requirement in a `requirements.txt` body.
pub fn parse_requirements(contents: &str) -> Result<Vec<RequirementSpec>, RegistrationError> {
    let mut specs = Vec::new();
    for line in contents.lines() {
        if let Some(spec) = RequirementSpec::parse(line)? {
            specs.push(spec);
        }
    }
    Ok(specs)
}

/// Map of top-level import name to requirement name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportMap {
    entries: BTreeMap<String, String>,
}

impl ImportMap {
    /// Create an empty import map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an import map from JSON. A missing file yields an empty map.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No import map found at {}", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read import map: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse import map: {}", path.display()))
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, import_name: impl Into<String>, requirement: impl Into<String>) {
        self.entries.insert(import_name.into(), requirement.into());
    }

    /// Requirement providing an import name.
    pub fn get(&self, import_name: &str) -> Option<&str> {
        self.entries.get(import_name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare the map against the current requirements.
    pub fn audit(&self, requirements: &[RequirementSpec]) -> ImportMapReport {
        let mapped: BTreeSet<&str> = self.entries.values().map(|s| s.as_str()).collect();
        let required: BTreeSet<&str> = requirements.iter().map(|r| r.name.as_str()).collect();

        let mut unmapped: Vec<String> = requirements
            .iter()
            .filter(|r| !mapped.contains(r.name.as_str()))
            .map(|r| r.requirement_name())
            .collect();
        unmapped.sort();
        unmapped.dedup();

        let stale = self
            .entries
            .iter()
            .filter(|(_, requirement)| !required.contains(requirement.as_str()))
            .map(|(import_name, _)| import_name.clone())
            .collect();

        ImportMapReport { unmapped, stale }
    }
}

impl FromIterator<(String, String)> for ImportMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        ImportMap {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Result of [`ImportMap::audit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportMapReport {
    /// Requirements no import name maps to
    pub unmapped: Vec<String>,
    /// Import names whose requirement is gone from requirements.txt
    pub stale: Vec<String>,
}

impl ImportMapReport {
    pub fn is_clean(&self) -> bool {
        self.unmapped.is_empty() && self.stale.is_empty()
    }
}
