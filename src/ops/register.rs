//! The registration pass.
//!
//! One pass runs discovery, the optional extra-target sweep, dependency
//! resolution and graph construction, and hands back everything a command
//! needs. Nothing is cached between passes.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;

use crate::core::package_config::PackageConfig;
use crate::core::registry::TargetRegistry;
use crate::core::target::{Target, TargetLocation};
use crate::ops::discover::discover_targets;
use crate::resolver::errors::{GraphError, RegistrationError};
use crate::resolver::graph::{DependencyGraph, Unvalidated, Validated};
use crate::resolver::resolve_dependencies;
use crate::scanner::ScanFailure;
use crate::util::context::PassContext;

/// Caller-supplied sweep that injects extra targets after discovery.
///
/// Injected targets replace any discovered target they collide with.
pub type RegistrationHook = dyn Fn(&PassContext) -> Result<Vec<Target>>;

/// Result of a registration pass.
#[derive(Debug)]
pub struct Registration {
    /// Every target by key, shared with the graph
    pub registry: BTreeMap<String, Arc<Target>>,

    /// Dependency graph, not yet checked for cycles
    pub graph: DependencyGraph<Unvalidated>,

    /// Files whose imports could not be read
    pub scan_failures: Vec<ScanFailure>,
}

impl Registration {
    /// Check the graph for cycles.
    pub fn validate(self) -> Result<ValidatedRegistration, GraphError> {
        Ok(ValidatedRegistration {
            registry: self.registry,
            graph: self.graph.validate()?,
            scan_failures: self.scan_failures,
        })
    }
}

/// A registration pass whose graph is known to be acyclic.
#[derive(Debug)]
pub struct ValidatedRegistration {
    pub registry: BTreeMap<String, Arc<Target>>,
    pub graph: DependencyGraph<Validated>,
    pub scan_failures: Vec<ScanFailure>,
}

/// Run a full registration pass.
pub fn register_all(
    ctx: &PassContext,
    hook: Option<&RegistrationHook>,
) -> Result<Registration, RegistrationError> {
    let mut registry = discover_targets(ctx)?;

    if let Some(hook) = hook {
        register_extra_targets(&mut registry, ctx, hook)?;
    }

    let scan_failures = resolve_dependencies(&mut registry, ctx)?;

    let registry = registry.freeze();
    let graph = DependencyGraph::build(&registry);
    tracing::info!("Registered {} targets", registry.len());

    Ok(Registration {
        registry,
        graph,
        scan_failures,
    })
}

/// Final sweep: add the hook's targets, last write wins.
pub fn register_extra_targets(
    registry: &mut TargetRegistry,
    ctx: &PassContext,
    hook: &RegistrationHook,
) -> Result<(), RegistrationError> {
    tracing::info!("Registering extra targets");

    let targets = hook(ctx).map_err(|e| RegistrationError::Hook {
        message: format!("{e:#}"),
    })?;
    for target in targets {
        let key = target.key().to_string();
        for replaced in registry.insert_override(target) {
            tracing::warn!("Extra target {} replaces registered target {}", key, replaced);
        }
    }

    Ok(())
}

/// Registration hook for the `[[extra_targets]]` tables of `weft.toml`.
pub fn extra_targets(ctx: &PassContext) -> Result<Vec<Target>> {
    let mut targets = Vec::with_capacity(ctx.config().extra_targets.len());

    for extra in &ctx.config().extra_targets {
        let package_name = extra.package_name.clone().unwrap_or_else(|| {
            extra
                .key
                .rsplit(['/', ':'])
                .next()
                .unwrap_or(&extra.key)
                .to_string()
        });
        let package_path = extra.path.as_ref().map(|p| ctx.path(p));
        let location = TargetLocation {
            source_root: extra.key.split('/').next().unwrap_or_default().to_string(),
            package_dir: package_path.clone().unwrap_or_else(|| ctx.path(&extra.key)),
            package_path,
            package_name,
            build_dir: extra.key.clone(),
        };

        let target = ctx
            .kinds()
            .construct(&extra.kind, location, PackageConfig::default())?
            .with_declared_dependencies(extra.dependencies.iter().cloned())
            .with_tags(extra.tags.iter().cloned());
        targets.push(target);
    }

    Ok(targets)
}

/// Every simple cycle in the graph, as lists of keys.
pub fn check_cycles<S>(graph: &DependencyGraph<S>) -> Vec<Vec<String>> {
    graph.cycles()
}

/// Closure of `key`, dependencies first.
pub fn transitive_dependencies(
    graph: &DependencyGraph<Validated>,
    key: &str,
    include_third_party: bool,
) -> Result<Vec<Arc<Target>>, GraphError> {
    graph.transitive_dependencies(key, include_third_party)
}
