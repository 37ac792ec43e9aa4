//! Registration and graph error types and diagnostics.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error during discovery or dependency resolution.
///
/// Every variant aborts the registration pass.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("duplicate target(s) found: {}", keys.join(", "))]
    DuplicateTarget { keys: Vec<String> },

    #[error("more than one package found in {}", src_dir.display())]
    MultipleSourcePackagesFound {
        src_dir: PathBuf,
        entries: Vec<String>,
    },

    #[error("manifest for `{target}` not found at {}", path.display())]
    MissingManifest { target: String, path: PathBuf },

    #[error("unknown target kind `{kind}`")]
    UnknownTargetKind { kind: String, known: Vec<String> },

    #[error("target kind `{kind}` is already registered")]
    DuplicateTargetKind { kind: String },

    #[error("no console_scripts entry point found for `{target}` in {}", path.display())]
    NoConsoleScript { target: String, path: PathBuf },

    #[error("invalid requirement `{line}`")]
    InvalidRequirement { line: String },

    #[error("multiple requirement extras are not supported for `{requirement}`: {}", extras.join(", "))]
    MultipleRequirementExtras {
        requirement: String,
        extras: Vec<String>,
    },

    #[error("invalid package config {}: {message}", path.display())]
    InvalidPackageConfig { path: PathBuf, message: String },

    #[error("extra target hook failed: {message}")]
    Hook { message: String },

    #[error("failed to start scan workers: {message}")]
    WorkerPool { message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RegistrationError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RegistrationError::Io {
            path: path.into(),
            source,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            RegistrationError::DuplicateTarget { keys } => {
                let mut diag = Diagnostic::error("duplicate targets found");
                for key in keys {
                    diag = diag.with_context(format!("`{}` is registered more than once", key));
                }
                diag.with_suggestion(
                    "Check the repository for old folders that have the same name".to_string(),
                )
            }

            RegistrationError::MultipleSourcePackagesFound { src_dir, entries } => {
                Diagnostic::error(format!(
                    "more than one package found in {}",
                    src_dir.display()
                ))
                .with_location(src_dir)
                .with_context(format!("found: {}", entries.join(", ")))
                .with_suggestion(suggestions::STALE_SOURCES)
            }

            RegistrationError::MissingManifest { target, path } => {
                Diagnostic::error(format!("could not find the manifest for `{}`", target))
                    .with_location(path)
                    .with_suggestion(
                        "Create the manifest or remove the stale project folder".to_string(),
                    )
            }

            RegistrationError::UnknownTargetKind { kind, known } => {
                let mut diag = Diagnostic::error(format!("unknown target kind `{}`", kind));
                if !known.is_empty() {
                    diag = diag.with_context(format!("known kinds: {}", known.join(", ")));
                }
                diag.with_suggestion(
                    "Fix the `type` in .weft.toml or add an alias under [kind_aliases]"
                        .to_string(),
                )
            }

            RegistrationError::DuplicateTargetKind { kind } => {
                Diagnostic::error(format!("target kind `{}` is registered twice", kind))
            }

            RegistrationError::NoConsoleScript { target, path } => Diagnostic::error(format!(
                "no console_scripts entry point for `{}`",
                target
            ))
            .with_location(path)
            .with_suggestion(
                "Add `entry_points={\"console_scripts\": [\"name = pkg.module:func\"]}`"
                    .to_string(),
            ),

            RegistrationError::InvalidRequirement { line } => {
                Diagnostic::error(format!("could not parse requirement `{}`", line))
            }

            RegistrationError::MultipleRequirementExtras {
                requirement,
                extras,
            } => Diagnostic::error(format!(
                "requirement `{}` declares more than one extra",
                requirement
            ))
            .with_context(format!("extras: {}", extras.join(", ")))
            .with_suggestion("Split the requirement so each line has at most one extra".to_string()),

            RegistrationError::InvalidPackageConfig { path, message } => {
                Diagnostic::error("invalid package configuration")
                    .with_location(path)
                    .with_context(message.clone())
            }

            RegistrationError::Hook { message } => {
                Diagnostic::error("the extra target hook failed").with_context(message.clone())
            }

            RegistrationError::WorkerPool { message } => {
                Diagnostic::error("could not start the import scanning workers")
                    .with_context(message.clone())
            }

            RegistrationError::Io { path, source } => Diagnostic::error(source.to_string())
                .with_location(path),
        }
    }
}

/// Error raised by dependency graph queries.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no target registered named `{key}`. Available targets: {}", known.join(", "))]
    UnknownTarget { key: String, known: Vec<String> },

    #[error("circular dependencies found ({} cycle(s))", cycles.len())]
    CircularDependency { cycles: Vec<Vec<String>> },
}

impl GraphError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GraphError::UnknownTarget { key, known } => {
                Diagnostic::error(format!("no target registered named `{}`", key))
                    .with_context(format!("available targets: {}", known.join(", ")))
                    .with_suggestion(suggestions::TARGET_NOT_FOUND)
            }

            GraphError::CircularDependency { cycles } => {
                let mut diag = Diagnostic::error("circular dependencies found");
                for cycle in cycles {
                    let mut chain = cycle.clone();
                    if let Some(first) = cycle.first() {
                        chain.push(first.clone());
                    }
                    diag = diag.with_context(format!("cycle: {}", chain.join(" -> ")));
                }
                diag.with_suggestion(
                    "Break the cycle by moving shared code into a new library".to_string(),
                )
            }
        }
    }
}
