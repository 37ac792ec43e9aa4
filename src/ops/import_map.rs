//! Import map maintenance check.

use anyhow::{Context, Result};

use crate::core::requirement::{parse_requirements, ImportMapReport};
use crate::util::context::PassContext;
use crate::util::fs::read_to_string;

/// Compare the import map against `requirements.txt`.
pub fn audit_import_map(ctx: &PassContext) -> Result<ImportMapReport> {
    let path = ctx.path(&ctx.config().requirements);
    let contents = read_to_string(&path)?;
    let requirements = parse_requirements(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    tracing::debug!(
        "Auditing {} requirements against {} import map entries",
        requirements.len(),
        ctx.import_map().len()
    );
    Ok(ctx.import_map().audit(&requirements))
}
