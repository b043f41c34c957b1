//! `easyant load` command

use anyhow::Result;

use super::Session;
use crate::cli::LoadArgs;

pub fn execute(session: Session, args: LoadArgs) -> Result<()> {
    let (ctx, descriptor) = session.load()?;
    let project = &ctx.project;

    println!("module {}", descriptor.mrid);
    if let Some(target) = project.default_target() {
        println!("default target: {}", target);
    }
    for import in project.imported() {
        match &import.alias {
            Some(alias) => println!("{} {} as {}", import.mode.as_str(), import.module, alias),
            None => println!("{} {}", import.mode.as_str(), import.module),
        }
    }

    println!();
    for phase in project.phases() {
        println!("{}", phase.name);
        for dep in &phase.depends {
            let bound = project.target(dep).is_some_and(|t| !t.is_phase());
            if bound {
                println!("  {}", dep);
            }
        }
    }

    if args.all {
        let unbound: Vec<&str> = project
            .targets()
            .filter(|t| !t.is_phase() && project.phases_binding(&t.name).is_empty())
            .map(|t| t.name.as_str())
            .collect();
        if !unbound.is_empty() {
            println!();
            println!("not bound to a phase:");
            for name in unbound {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}
