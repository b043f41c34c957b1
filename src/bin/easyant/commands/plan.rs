//! `easyant plan` command

use anyhow::{bail, Result};

use super::Session;
use crate::cli::PlanArgs;

pub fn execute(session: Session, args: PlanArgs) -> Result<()> {
    let (ctx, descriptor) = session.load()?;

    let target = match args.target.as_deref().or(ctx.project.default_target()) {
        Some(target) => target.to_string(),
        None => bail!(
            "no target given and {} declares no default target\n\
             help: Pass a target, e.g. `easyant plan package`",
            descriptor.mrid
        ),
    };

    for name in ctx.project.execution_order(&target)? {
        println!("{}", name);
    }
    Ok(())
}
