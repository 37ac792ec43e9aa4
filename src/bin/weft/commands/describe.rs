//! `weft describe` command

use anyhow::Result;

use super::Session;
use crate::cli::DescribeArgs;
use weft::ops::{describe, DescribeOptions};

pub fn execute(args: DescribeArgs, session: &Session) -> Result<()> {
    let ctx = session.context()?;
    let registration = session.register(&ctx)?.validate()?;

    let opts = DescribeOptions {
        target_pattern: args.target_pattern,
    };
    let descriptors = describe(&registration, &ctx, &opts)?;

    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(())
}
