//! Dependency resolution.
//!
//! Turns scanned imports into dependency edges in two phases. Phase one
//! scans every file of every import-scanning target in parallel and maps
//! each import name through [`Target::resolve_dependency`]. Phase two runs
//! [`Target::derive_structural_dependencies`] on every target once all
//! import edges exist. Edges are applied on the calling thread only.

pub mod cycles;
pub mod errors;
pub mod graph;

pub use errors::{GraphError, RegistrationError};
pub use graph::{DependencyGraph, Unvalidated, Validated};

use std::collections::BTreeSet;

use crate::core::registry::TargetRegistry;
use crate::core::target::{Resolution, Target};
use crate::scanner::{scan_all, ScanFailure, ScanOutcome, ScanUnit};
use crate::util::context::PassContext;

/// Resolve the dependencies of every registered target.
///
/// Returns the files that could not be scanned; their imports contribute no
/// edges. Registry-level failures abort.
pub fn resolve_dependencies(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
) -> Result<Vec<ScanFailure>, RegistrationError> {
    let ignore_dirs = &ctx.config().ignore_dirs;

    let mut units: Vec<ScanUnit> = Vec::new();
    for target in registry.iter() {
        units.extend(target.files_to_scan(ignore_dirs)?);
    }
    tracing::info!(
        "Scanning {} files across {} targets",
        units.len(),
        registry.len()
    );

    let (outcomes, failures) = scan_all(&units, ctx.jobs())?;
    for failure in &failures {
        tracing::warn!("{}", failure.error);
    }

    let edges = import_edges(registry, ctx, &outcomes);
    apply_edges(registry, edges);

    let mut structural: Vec<(String, Resolution)> = Vec::new();
    {
        let index = registry.index(ctx.import_map());
        for target in registry.iter() {
            for resolution in target.derive_structural_dependencies(&index)? {
                structural.push((target.key().to_string(), resolution));
            }
        }
    }
    apply_edges(registry, structural);

    Ok(failures)
}

/// Map every scanned import to the edge it implies, in outcome order.
fn import_edges(
    registry: &TargetRegistry,
    ctx: &PassContext,
    outcomes: &[ScanOutcome],
) -> Vec<(String, Resolution)> {
    let index = registry.index(ctx.import_map());
    let mut edges = Vec::new();
    for outcome in outcomes {
        let Some(owner) = registry.get(&outcome.owner) else {
            continue;
        };
        for name in &outcome.imports {
            if let Some(resolution) = owner.resolve_dependency(name, &index) {
                edges.push((outcome.owner.clone(), resolution));
            }
        }
    }
    edges
}

fn apply_edges(registry: &mut TargetRegistry, edges: Vec<(String, Resolution)>) {
    for (owner, resolution) in edges {
        let dependency = match resolution {
            Resolution::Target(key) => key,
            Resolution::Requirement(name) => registry.ensure_requirement(&name),
        };
        if let Some(target) = registry.get_mut(&owner) {
            if target.add_dependency(dependency.clone()) {
                tracing::debug!("{} -> {}", owner, dependency);
            }
        }
    }
}

/// Keys of every target's dependencies, for comparing two passes.
pub fn edge_set<'a>(targets: impl IntoIterator<Item = &'a Target>) -> BTreeSet<(String, String)> {
    targets
        .into_iter()
        .flat_map(|t| {
            t.dependencies()
                .iter()
                .map(move |d| (t.key().to_string(), d.clone()))
        })
        .collect()
}
