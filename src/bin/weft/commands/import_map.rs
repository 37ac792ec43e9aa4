//! `weft import-map` command

use anyhow::{bail, Result};

use super::Session;
use crate::cli::ImportMapArgs;
use weft::ops::audit_import_map;
use weft::util::diagnostic::{emit, suggestions, Diagnostic};

pub fn execute(_args: ImportMapArgs, session: &Session) -> Result<()> {
    let ctx = session.context()?;
    let report = audit_import_map(&ctx)?;

    if report.is_clean() {
        println!("Import map is up to date");
        return Ok(());
    }

    for requirement in &report.unmapped {
        println!("unmapped\t{}", requirement);
    }
    for import_name in &report.stale {
        println!("stale\t{}", import_name);
    }

    emit(
        &Diagnostic::warning("import map does not match requirements.txt")
            .with_location(ctx.path(&ctx.config().import_map))
            .with_suggestion(suggestions::STALE_IMPORT_MAP),
        session.color(),
    );
    bail!(
        "import map is out of date ({} unmapped, {} stale)",
        report.unmapped.len(),
        report.stale.len()
    )
}
