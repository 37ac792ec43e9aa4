//! Import scanning.
//!
//! Extracts the top-level module names a Python file imports using the
//! tree-sitter Python grammar. Only the first segment of each import path is
//! kept (`import foo.bar` yields `foo`); relative imports are dropped because
//! they never name another package.
//!
//! Scanning is a pure function of file contents, so [`scan_all`] fans the
//! work out over a rayon pool with no shared state between workers.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

use crate::resolver::errors::RegistrationError;
use crate::util::diagnostic::Diagnostic;

/// One file to scan, tagged with the key of the target owning it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScanUnit {
    pub owner: String,
    pub path: PathBuf,
}

impl ScanUnit {
    pub fn new(owner: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ScanUnit {
            owner: owner.into(),
            path: path.into(),
        }
    }
}

/// Import names found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub owner: String,
    pub path: PathBuf,
    pub imports: BTreeSet<String>,
}

/// A file whose imports could not be read.
#[derive(Debug)]
pub struct ScanFailure {
    pub owner: String,
    pub path: PathBuf,
    pub error: ScanError,
}

impl ScanFailure {
    pub fn to_diagnostic(&self) -> Diagnostic {
        self.error
            .to_diagnostic()
            .with_context(format!("while scanning imports for `{}`", self.owner))
    }
}

/// Error scanning a single file.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("syntax error in {} at line {line}", path.display())]
    Syntax { path: PathBuf, line: usize },

    #[error("failed to load the Python grammar: {message}")]
    Grammar { message: String },
}

impl ScanError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ScanError::Io { path, source } => {
                Diagnostic::warning(format!("could not read source file: {}", source))
                    .with_location(path)
            }
            ScanError::Syntax { path, line } => {
                Diagnostic::warning(format!("syntax error at line {}", line))
                    .with_location(path)
                    .with_context("imports from this file were not resolved")
            }
            ScanError::Grammar { message } => {
                Diagnostic::warning("could not load the Python grammar").with_context(message.clone())
            }
        }
    }
}

fn python_parser() -> Result<Parser, ScanError> {
    let language: Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ScanError::Grammar {
            message: e.to_string(),
        })?;
    Ok(parser)
}

/// Top-level import names in a file.
pub fn scan_file(path: &Path) -> Result<BTreeSet<String>, ScanError> {
    let source = std::fs::read(path).map_err(|e| ScanError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    scan_source(path, &source)
}

/// Top-level import names in Python source. `path` is only used for errors.
pub fn scan_source(path: &Path, source: &[u8]) -> Result<BTreeSet<String>, ScanError> {
    let mut parser = python_parser()?;
    let tree = parser.parse(source, None).ok_or_else(|| ScanError::Syntax {
        path: path.to_path_buf(),
        line: 1,
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let line = first_error(&root).map_or(1, |n| n.start_position().row + 1);
        return Err(ScanError::Syntax {
            path: path.to_path_buf(),
            line,
        });
    }

    let mut imports = BTreeSet::new();
    collect_imports(&root, source, &mut imports);
    Ok(imports)
}

fn first_error<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.has_error() || child.is_missing() {
                if let Some(found) = first_error(&child) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn collect_imports(node: &Node, source: &[u8], imports: &mut BTreeSet<String>) {
    match node.kind() {
        // import a.b, c as d
        "import_statement" => {
            for i in 0..node.child_count() {
                let Some(child) = node.child(i) else { continue };
                let name = match child.kind() {
                    "dotted_name" => Some(child),
                    "aliased_import" => child.child_by_field_name("name"),
                    _ => None,
                };
                if let Some(segment) = name.and_then(|n| first_segment(&n, source)) {
                    imports.insert(segment);
                }
            }
        }

        // from a.b import c; relative modules are skipped
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                if module.kind() == "dotted_name" {
                    if let Some(segment) = first_segment(&module, source) {
                        imports.insert(segment);
                    }
                }
            }
        }

        "future_import_statement" => {}

        _ => {
            for i in 0..node.child_count() {
                if let Some(child) = node.child(i) {
                    collect_imports(&child, source, imports);
                }
            }
        }
    }
}

fn first_segment(dotted_name: &Node, source: &[u8]) -> Option<String> {
    let head = dotted_name.child(0).unwrap_or(*dotted_name);
    let text = head.utf8_text(source).ok()?;
    let segment = text.split('.').next()?.trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

/// Scan every unit on a pool of `jobs` worker threads.
///
/// Per-file failures are returned alongside successes; only a pool that
/// cannot start is an error.
pub fn scan_all(
    units: &[ScanUnit],
    jobs: usize,
) -> Result<(Vec<ScanOutcome>, Vec<ScanFailure>), RegistrationError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("weft-scan-{}", i))
        .build()
        .map_err(|e| RegistrationError::WorkerPool {
            message: e.to_string(),
        })?;

    tracing::debug!("Scanning {} files on {} workers", units.len(), jobs.max(1));

    let results: Vec<Result<ScanOutcome, ScanFailure>> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| match scan_file(&unit.path) {
                Ok(imports) => Ok(ScanOutcome {
                    owner: unit.owner.clone(),
                    path: unit.path.clone(),
                    imports,
                }),
                Err(error) => Err(ScanFailure {
                    owner: unit.owner.clone(),
                    path: unit.path.clone(),
                    error,
                }),
            })
            .collect()
    });

    let mut outcomes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(failure) => failures.push(failure),
        }
    }
    Ok((outcomes, failures))
}

/// Default worker count: one per core, minus one for the coordinating thread.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
