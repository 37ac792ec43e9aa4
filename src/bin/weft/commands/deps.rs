//! `weft deps` command

use anyhow::Result;

use super::Session;
use crate::cli::DepsArgs;
use weft::ops::transitive_dependencies;
use weft::TargetKind;

pub fn execute(args: DepsArgs, session: &Session) -> Result<()> {
    let ctx = session.context()?;
    let registration = session.register(&ctx)?.validate()?;

    let targets = if args.direct {
        registration
            .graph
            .dependencies_of(&args.target)?
            .into_iter()
            .filter(|t| args.include_third_party || t.kind() != TargetKind::Requirement)
            .collect()
    } else {
        transitive_dependencies(&registration.graph, &args.target, args.include_third_party)?
    };

    // Requirements share a build dir, so print their keys
    for target in targets {
        match target.kind() {
            TargetKind::Requirement => println!("{}", target.key()),
            _ => println!("{}", target.build_dir()),
        }
    }
    Ok(())
}
