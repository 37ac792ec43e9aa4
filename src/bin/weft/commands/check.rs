//! `weft check` command

use anyhow::{bail, Result};

use super::Session;
use crate::cli::CheckArgs;
use weft::ops::check_cycles;
use weft::resolver::GraphError;

pub fn execute(args: CheckArgs, session: &Session) -> Result<()> {
    let ctx = session.context()?;
    let registration = session.register(&ctx)?;

    let cycles = check_cycles(&registration.graph);
    if !cycles.is_empty() {
        return Err(GraphError::CircularDependency { cycles }.into());
    }

    if args.strict && !registration.scan_failures.is_empty() {
        bail!(
            "{} file(s) could not be scanned",
            registration.scan_failures.len()
        );
    }

    println!(
        "{} targets, {} dependencies, no cycles",
        registration.graph.len(),
        registration.graph.edges().len()
    );
    Ok(())
}
