//! Descriptor generation.
//!
//! Collects the descriptor blocks of every target for the build-file
//! renderer. Only an acyclic registration can be described.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::core::target::{DescriptorBlock, Target, TargetKind};
use crate::ops::register::ValidatedRegistration;
use crate::util::context::PassContext;

/// Options for descriptor generation.
#[derive(Debug, Clone, Default)]
pub struct DescribeOptions {
    /// Only describe targets whose key matches this pattern.
    pub target_pattern: Option<String>,
}

/// Everything the renderer needs for one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetDescriptor {
    pub key: String,
    pub kind: TargetKind,
    pub build_dir: String,
    pub blocks: Vec<DescriptorBlock>,
}

/// Describe every matching target, in key order.
///
/// Requirements and packages that opted out of build files are left out.
pub fn describe(
    registration: &ValidatedRegistration,
    ctx: &PassContext,
    opts: &DescribeOptions,
) -> Result<Vec<TargetDescriptor>> {
    let pattern = opts
        .target_pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid target pattern")?;

    let mut descriptors = Vec::new();
    for (key, target) in &registration.registry {
        if target.kind() == TargetKind::Requirement {
            continue;
        }
        if let Some(pattern) = &pattern {
            if !pattern.is_match(key) {
                continue;
            }
        }

        let dependencies = dependency_descriptors(registration, target);
        let blocks = target
            .descriptor_blocks(&dependencies, ctx.config())
            .with_context(|| format!("failed to describe {key}"))?;
        if blocks.is_empty() {
            continue;
        }

        descriptors.push(TargetDescriptor {
            key: key.clone(),
            kind: target.kind(),
            build_dir: target.build_dir().to_string(),
            blocks,
        });
    }

    tracing::info!("Described {} targets", descriptors.len());
    Ok(descriptors)
}

/// How `target` refers to each of its dependencies.
fn dependency_descriptors(registration: &ValidatedRegistration, target: &Target) -> Vec<String> {
    target
        .dependencies()
        .iter()
        .map(|key| match registration.registry.get(key) {
            Some(dependency) => dependency.dependency_descriptor(),
            None => key.clone(),
        })
        .collect()
}
