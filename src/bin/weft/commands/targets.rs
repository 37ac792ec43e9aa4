//! `weft targets` command

use anyhow::Result;

use super::Session;
use crate::cli::TargetsArgs;

pub fn execute(args: TargetsArgs, session: &Session) -> Result<()> {
    let ctx = session.context()?;
    let registration = session.register(&ctx)?;

    for (key, target) in &registration.registry {
        let kind = target.kind().as_str();
        if args.kind.as_deref().is_some_and(|k| k != kind) {
            continue;
        }
        println!("{}\t{}", key, kind);
    }
    Ok(())
}
