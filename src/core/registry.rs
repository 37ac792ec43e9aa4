//! Target registry.
//!
//! The registry owns every target discovered during a registration pass,
//! keyed by target key. Code targets are also indexed by package name so
//! scanned import names can be turned into edges.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::requirement::ImportMap;
use crate::core::target::{requirement_key, Target, TargetKind};
use crate::resolver::errors::RegistrationError;

/// All targets of one registration pass.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    /// Targets by key
    targets: BTreeMap<String, Target>,

    /// Package name to key, for code targets
    packages: HashMap<String, String>,

    /// Key prefix of requirement targets
    requirements_dir: String,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new(requirements_dir: impl Into<String>) -> Self {
        TargetRegistry {
            targets: BTreeMap::new(),
            packages: HashMap::new(),
            requirements_dir: requirements_dir.into(),
        }
    }

    /// Key of the registered target `target` would collide with, if any.
    ///
    /// A collision is either the same key or, for code targets, the same
    /// package name.
    pub fn conflicting_key(&self, target: &Target) -> Option<&str> {
        if let Some((key, _)) = self.targets.get_key_value(target.key()) {
            return Some(key.as_str());
        }
        if target.kind().is_code() {
            return self.packages.get(target.package_name()).map(|s| s.as_str());
        }
        None
    }

    /// Register a target, refusing collisions.
    pub fn insert(&mut self, target: Target) -> Result<(), RegistrationError> {
        if let Some(existing) = self.conflicting_key(&target) {
            let mut keys = vec![existing.to_string()];
            if existing != target.key() {
                keys.push(target.key().to_string());
            }
            return Err(RegistrationError::DuplicateTarget { keys });
        }

        self.index_package(&target);
        tracing::debug!("Registered {} target {}", target.kind(), target.key());
        self.targets.insert(target.key().to_string(), target);
        Ok(())
    }

    /// Register a target, replacing any target it collides with.
    ///
    /// Returns the keys of the replaced targets.
    pub fn insert_override(&mut self, target: Target) -> Vec<String> {
        let mut replaced = Vec::new();

        if self.targets.remove(target.key()).is_some() {
            replaced.push(target.key().to_string());
        }
        if target.kind().is_code() {
            if let Some(key) = self.packages.remove(target.package_name()) {
                if key != target.key() && self.targets.remove(&key).is_some() {
                    replaced.push(key);
                }
            }
        }
        self.packages.retain(|_, key| key != target.key());

        self.index_package(&target);
        self.targets.insert(target.key().to_string(), target);
        replaced
    }

    fn index_package(&mut self, target: &Target) {
        if target.kind().is_code() {
            self.packages
                .insert(target.package_name().to_string(), target.key().to_string());
        }
    }

    /// Make sure a requirement target exists for `name` and return its key.
    pub fn ensure_requirement(&mut self, name: &str) -> String {
        let key = requirement_key(&self.requirements_dir, name);
        if !self.targets.contains_key(&key) {
            tracing::debug!("Registered requirement {}", key);
            self.targets
                .insert(key.clone(), Target::requirement(&self.requirements_dir, name));
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<&Target> {
        self.targets.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Target> {
        self.targets.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.targets.contains_key(key)
    }

    /// Remove a target by key.
    pub fn remove(&mut self, key: &str) -> Option<Target> {
        let target = self.targets.remove(key)?;
        self.packages.retain(|_, k| k != key);
        Some(target)
    }

    /// Iterate over targets in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(|k| k.as_str())
    }

    /// Key of the code target with the given package name.
    pub fn package_key(&self, package_name: &str) -> Option<&str> {
        self.packages.get(package_name).map(|s| s.as_str())
    }

    /// Targets of one kind, in key order.
    pub fn of_kind(&self, kind: TargetKind) -> impl Iterator<Item = &Target> {
        self.targets.values().filter(move |t| t.kind() == kind)
    }

    pub fn requirements_dir(&self) -> &str {
        &self.requirements_dir
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Read-only view used while resolving import names.
    pub fn index<'a>(&'a self, import_map: &'a ImportMap) -> RegistryIndex<'a> {
        RegistryIndex {
            registry: self,
            import_map,
        }
    }

    /// Freeze the registry once dependency sets are final.
    pub fn freeze(self) -> BTreeMap<String, Arc<Target>> {
        self.targets
            .into_iter()
            .map(|(key, target)| (key, Arc::new(target)))
            .collect()
    }
}

/// Lookup tables consulted by targets while resolving dependencies.
#[derive(Debug, Clone, Copy)]
pub struct RegistryIndex<'a> {
    registry: &'a TargetRegistry,
    import_map: &'a ImportMap,
}

impl<'a> RegistryIndex<'a> {
    /// Key of the code target providing the import name.
    pub fn package_key(&self, package_name: &str) -> Option<&'a str> {
        self.registry.package_key(package_name)
    }

    /// Requirement providing a third-party import name.
    pub fn requirement_for(&self, import_name: &str) -> Option<&'a str> {
        self.import_map.get(import_name)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registry.contains(key)
    }
}
