//! Target discovery.
//!
//! Discovery runs as a series of sweeps over the repository, each adding
//! targets to the registry:
//!
//! 1. Code packages: every directory under a configured source root holding
//!    the manifest marker (`setup.py`) with a single package below `src/`.
//! 2. Test suites: `<package>/tests/{unit,functional,component}` for every
//!    code package.
//! 3. Aggregate projects: every directory directly under the project root.
//!
//! Within a sweep all collisions are gathered before failing, so one error
//! names every duplicate key.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::package_config::PackageConfig;
use crate::core::registry::TargetRegistry;
use crate::core::target::{Target, TargetLocation, TestCategory};
use crate::resolver::errors::RegistrationError;
use crate::util::context::PassContext;
use crate::util::fs::{relative_key, subdirectories};

/// Run every discovery sweep into a fresh registry.
pub fn discover_targets(ctx: &PassContext) -> Result<TargetRegistry, RegistrationError> {
    let mut registry = TargetRegistry::new(ctx.config().requirements_dir.clone());

    register_code_targets(&mut registry, ctx)?;
    register_test_targets(&mut registry, ctx)?;
    register_project_targets(&mut registry, ctx)?;

    Ok(registry)
}

/// Register the code package found in `package_dir`, e.g. one just created
/// by a scaffolding tool. Returns its key, or `None` if the directory holds
/// nothing to register.
pub fn register_package(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
    source_root: &str,
    package_dir: &Path,
) -> Result<Option<String>, RegistrationError> {
    let Some(target) = code_target(ctx, source_root, package_dir)? else {
        return Ok(None);
    };
    let key = target.key().to_string();
    registry.insert(target)?;
    Ok(Some(key))
}

/// Sweep 1: code packages.
pub fn register_code_targets(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
) -> Result<(), RegistrationError> {
    tracing::info!("Registering code targets");

    let mut duplicates = Vec::new();
    for source_root in &ctx.config().top_dirs {
        let top_dir = ctx.path(source_root);
        if !top_dir.is_dir() {
            tracing::debug!("Source root {} does not exist", top_dir.display());
            continue;
        }

        for package_dir in manifest_dirs(ctx, &top_dir)? {
            let Some(target) = code_target(ctx, source_root, &package_dir)? else {
                continue;
            };
            admit(registry, ctx, target, &mut duplicates)?;
        }
    }

    finish_sweep(duplicates)
}

/// Sweep 2: test suites of code packages.
pub fn register_test_targets(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
) -> Result<(), RegistrationError> {
    tracing::info!("Registering test targets");

    let code_targets: Vec<Target> = registry
        .iter()
        .filter(|t| t.kind().is_code())
        .cloned()
        .collect();

    let mut duplicates = Vec::new();
    for code_target in &code_targets {
        for category in TestCategory::ALL {
            let tests_dir = code_target
                .package_dir()
                .join("tests")
                .join(category.as_str());
            if !tests_dir.is_dir() {
                continue;
            }

            let key = relative_key(ctx.root(), &tests_dir);
            let location = TargetLocation {
                source_root: code_target.source_root().to_string(),
                package_dir: code_target.package_dir().to_path_buf(),
                package_path: Some(tests_dir),
                package_name: key.clone(),
                build_dir: key,
            };
            let target = Target::test_suite(
                location,
                category,
                code_target.package_name(),
                code_target.config().clone(),
            );
            admit(registry, ctx, target, &mut duplicates)?;
        }
    }

    finish_sweep(duplicates)
}

/// Sweep 3: aggregate projects.
pub fn register_project_targets(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
) -> Result<(), RegistrationError> {
    tracing::info!("Registering project targets");

    let project_root = &ctx.config().project_root;
    let project_dir = ctx.path(project_root);
    let projects =
        subdirectories(&project_dir).map_err(|e| RegistrationError::io(&project_dir, e))?;

    let mut duplicates = Vec::new();
    for project in projects {
        if is_ignored_dir(ctx, &project) {
            continue;
        }

        let key = relative_key(ctx.root(), &project);
        let config = PackageConfig::for_package(&project)?;
        let manifest = project.join(&ctx.config().project_manifest);
        let location = TargetLocation {
            source_root: project_root.clone(),
            package_dir: project.clone(),
            package_path: None,
            package_name: key.clone(),
            build_dir: key,
        };
        let target = Target::project(location, manifest, config);
        admit(registry, ctx, target, &mut duplicates)?;
    }

    finish_sweep(duplicates)
}

/// Build the code target for a package directory.
///
/// Returns `None` when `src/` is missing or holds no package.
fn code_target(
    ctx: &PassContext,
    source_root: &str,
    package_dir: &Path,
) -> Result<Option<Target>, RegistrationError> {
    let src_dir = package_dir.join("src");
    let Some(package_path) = single_source_package(&src_dir)? else {
        return Ok(None);
    };

    let package_name = package_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let package_key = relative_key(ctx.root(), package_dir);
    let config = PackageConfig::for_package(package_dir)?;

    let kind_name = config
        .kind
        .clone()
        .or_else(|| {
            ctx.config()
                .kind_override(&package_name, &package_key)
                .map(String::from)
        })
        .unwrap_or_else(|| "library".to_string());

    let location = TargetLocation {
        source_root: source_root.to_string(),
        package_dir: package_dir.to_path_buf(),
        package_path: Some(package_path),
        package_name,
        build_dir: relative_key(ctx.root(), &src_dir),
    };
    let target = ctx.kinds().construct(&kind_name, location, config)?;
    Ok(Some(target))
}

/// The single package directory inside `src/`.
///
/// Build metadata (`*.egg-info`) and bytecode caches are not packages.
fn single_source_package(src_dir: &Path) -> Result<Option<PathBuf>, RegistrationError> {
    if !src_dir.is_dir() {
        return Ok(None);
    }

    let entries: Vec<PathBuf> = subdirectories(src_dir)
        .map_err(|e| RegistrationError::io(src_dir, e))?
        .into_iter()
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            !name.contains("egg-info") && !name.contains("pycache")
        })
        .collect();

    match entries.len() {
        0 => {
            tracing::debug!("No package found in {}", src_dir.display());
            Ok(None)
        }
        1 => Ok(entries.into_iter().next()),
        _ => Err(RegistrationError::MultipleSourcePackagesFound {
            src_dir: src_dir.to_path_buf(),
            entries: entries
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        }),
    }
}

/// Directories under `top_dir` holding the manifest marker, sorted.
fn manifest_dirs(ctx: &PassContext, top_dir: &Path) -> Result<Vec<PathBuf>, RegistrationError> {
    let marker = &ctx.config().manifest_marker;
    let mut dirs = Vec::new();

    let walker = WalkDir::new(top_dir).sort_by_file_name().into_iter();
    let walker = walker.filter_entry(|e| {
        e.depth() == 0 || !e.file_type().is_dir() || !is_ignored_dir(ctx, e.path())
    });
    for entry in walker {
        let entry = entry.map_err(|e| RegistrationError::io(top_dir, e.into()))?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy() == marker.as_str()
        {
            if let Some(parent) = entry.path().parent() {
                dirs.push(parent.to_path_buf());
            }
        }
    }

    Ok(dirs)
}

fn is_ignored_dir(ctx: &PassContext, path: &Path) -> bool {
    path.file_name()
        .map(|n| ctx.config().ignore_dirs.contains(n.to_string_lossy().as_ref()))
        .unwrap_or(false)
}

/// Insert a target unless ignored, recording collisions instead of failing.
fn admit(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
    target: Target,
    duplicates: &mut Vec<String>,
) -> Result<(), RegistrationError> {
    if ctx.config().ignore_targets.contains(target.key()) {
        tracing::debug!("Ignoring {}", target.key());
        return Ok(());
    }

    match registry.insert(target) {
        Err(RegistrationError::DuplicateTarget { keys }) => {
            for key in keys {
                if !duplicates.contains(&key) {
                    duplicates.push(key);
                }
            }
            Ok(())
        }
        other => other,
    }
}

fn finish_sweep(duplicates: Vec<String>) -> Result<(), RegistrationError> {
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(RegistrationError::DuplicateTarget { keys: duplicates })
    }
}
