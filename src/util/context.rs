//! Pass context for Weft operations.
//!
//! A [`PassContext`] carries everything one registration pass reads: the
//! repository root, the merged configuration, the import map and the table
//! of target kinds. It is built once per pass and passed explicitly.
//!
//! ## Kind table
//!
//! Package directories pick their target kind by name (`type` in
//! `.weft.toml`, or `[kinds]` in `weft.toml`). The [`KindTable`] maps each
//! accepted name to a constructor. Aliases from `[kind_aliases]` and the
//! `[kinds]` overrides are checked against the table whenever a context takes
//! one, so a bad name fails before any discovery runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::package_config::PackageConfig;
use crate::core::requirement::ImportMap;
use crate::core::target::{Target, TargetKind, TargetLocation};
use crate::resolver::errors::RegistrationError;
use crate::scanner::default_jobs;
use crate::util::config::{global_config_path, load_config, Config, PROJECT_CONFIG_NAME};

/// Builds a package target of one kind.
pub type TargetConstructor = fn(TargetLocation, PackageConfig) -> Target;

/// A named kind a package can be registered as.
#[derive(Debug, Clone, Copy)]
pub struct KindEntry {
    pub kind: TargetKind,
    pub construct: TargetConstructor,
}

impl KindEntry {
    pub fn new(kind: TargetKind, construct: TargetConstructor) -> Self {
        KindEntry { kind, construct }
    }
}

/// Mapping from kind name to constructor.
#[derive(Debug, Clone)]
pub struct KindTable {
    entries: BTreeMap<String, KindEntry>,
}

impl KindTable {
    /// Create an empty table.
    pub fn empty() -> Self {
        KindTable {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in package kinds.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            "library".to_string(),
            KindEntry::new(TargetKind::Library, Target::library),
        );
        entries.insert(
            "binary".to_string(),
            KindEntry::new(TargetKind::Binary, Target::binary),
        );
        entries.insert(
            "lambda".to_string(),
            KindEntry::new(TargetKind::Lambda, Target::lambda),
        );
        entries.insert(
            "migration".to_string(),
            KindEntry::new(TargetKind::Migration, Target::migration),
        );
        // Behave feature packages are test suites with their own setup.py
        entries.insert(
            "behave".to_string(),
            KindEntry::new(TargetKind::TestSuite, Target::behave_suite),
        );
        KindTable { entries }
    }

    /// Built-in kinds plus configured aliases.
    pub fn with_aliases(aliases: &BTreeMap<String, String>) -> Result<Self, RegistrationError> {
        let mut table = Self::builtin();
        table.apply_aliases(aliases)?;
        Ok(table)
    }

    /// Register each alias under the entry of the kind it names.
    ///
    /// An alias that is already present for the same target kind is kept, so
    /// applying the same aliases twice is harmless.
    pub fn apply_aliases(
        &mut self,
        aliases: &BTreeMap<String, String>,
    ) -> Result<(), RegistrationError> {
        for (alias, kind) in aliases {
            let entry = *self.get(kind)?;
            let present = self
                .entries
                .get(alias)
                .is_some_and(|existing| existing.kind == entry.kind);
            if !present {
                self.register(alias, entry)?;
            }
        }
        Ok(())
    }

    /// Add a kind name. Names are never silently replaced.
    pub fn register(&mut self, name: &str, entry: KindEntry) -> Result<(), RegistrationError> {
        if self.entries.contains_key(name) {
            return Err(RegistrationError::DuplicateTargetKind {
                kind: name.to_string(),
            });
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    /// Look up a kind by name.
    pub fn get(&self, name: &str) -> Result<&KindEntry, RegistrationError> {
        self.entries
            .get(name)
            .ok_or_else(|| RegistrationError::UnknownTargetKind {
                kind: name.to_string(),
                known: self.names(),
            })
    }

    /// Construct a target of the named kind.
    pub fn construct(
        &self,
        name: &str,
        location: TargetLocation,
        config: PackageConfig,
    ) -> Result<Target, RegistrationError> {
        let entry = self.get(name)?;
        Ok((entry.construct)(location, config))
    }

    /// Known kind names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Everything a registration pass reads.
#[derive(Debug, Clone)]
pub struct PassContext {
    /// Repository root
    root: PathBuf,

    /// Merged configuration
    config: Config,

    /// Third-party import name to requirement name
    import_map: ImportMap,

    /// Package kinds by name
    kinds: KindTable,
}

impl PassContext {
    /// Create a context from already-loaded parts.
    pub fn new(
        root: impl Into<PathBuf>,
        config: Config,
        import_map: ImportMap,
    ) -> Result<Self, RegistrationError> {
        Self::with_kind_table(root, config, import_map, KindTable::builtin())
    }

    /// Create a context with a caller-supplied kind table.
    ///
    /// Configured aliases are added to `kinds` and every `[kinds]` override
    /// must name an entry of the result.
    pub fn with_kind_table(
        root: impl Into<PathBuf>,
        config: Config,
        import_map: ImportMap,
        kinds: KindTable,
    ) -> Result<Self, RegistrationError> {
        let kinds = validate_kinds(kinds, &config)?;

        Ok(PassContext {
            root: root.into(),
            config,
            import_map,
            kinds,
        })
    }

    /// Load configuration and the import map for the repository at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let global = global_config_path();
        Self::load_with_global(root, global.as_deref())
    }

    /// Like [`PassContext::load`], layering `global` under the project config
    /// instead of `~/.weft/config.toml`.
    pub fn load_with_global(root: &Path, global: Option<&Path>) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("repository root not found: {}", root.display()))?;

        let config = load_config(global, &root.join(PROJECT_CONFIG_NAME))?;
        let import_map = ImportMap::load(&root.join(&config.import_map))?;
        tracing::debug!("Loaded {} import map entries", import_map.len());

        Ok(Self::new(root, config, import_map)?)
    }

    /// Replace the kind table, e.g. to add caller-defined kinds.
    ///
    /// The new table is checked the same way [`PassContext::with_kind_table`]
    /// checks it.
    pub fn with_kinds(self, kinds: KindTable) -> Result<Self, RegistrationError> {
        let kinds = validate_kinds(kinds, &self.config)?;
        Ok(PassContext { kinds, ..self })
    }

    /// Get the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn import_map(&self) -> &ImportMap {
        &self.import_map
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    /// Number of scan workers.
    pub fn jobs(&self) -> usize {
        self.config.jobs.unwrap_or_else(default_jobs).max(1)
    }

    /// Resolve a repository-relative path.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

fn validate_kinds(mut kinds: KindTable, config: &Config) -> Result<KindTable, RegistrationError> {
    kinds.apply_aliases(&config.kind_aliases)?;
    for kind in config.kinds.values() {
        kinds.get(kind)?;
    }
    Ok(kinds)
}
