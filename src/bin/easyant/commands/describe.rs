//! `easyant describe` command

use anyhow::Result;

use super::Session;
use crate::cli::DescribeArgs;
use easyant::report::{EasyAntReport, ImportedModuleReport, ReportBuilder};

pub fn execute(session: Session, args: DescribeArgs) -> Result<()> {
    let ctx = session.context();
    let report = ReportBuilder::from_context(&ctx).descriptor_report(&session.descriptor)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report, !args.no_imports);
    Ok(())
}

fn print_report(report: &EasyAntReport, include_imports: bool) {
    println!("module {}", report.module);
    if let Some(description) = &report.description {
        println!("  {}", description);
    }

    let (targets, phases, parameters, properties) = if include_imports {
        (
            report.available_targets(),
            report.available_phases(),
            report.available_parameters(),
            report.available_properties(),
        )
    } else {
        (
            report.targets.clone(),
            report.phases.clone(),
            report.parameters.clone(),
            report.properties.clone(),
        )
    };

    if !phases.is_empty() {
        println!("\nphases:");
        for phase in &phases {
            println!("  {}", phase.name);
            for target in report.targets_for_phase(&phase.name, include_imports) {
                println!("    {}", target.name);
            }
        }
    }

    if !targets.is_empty() {
        println!("\ntargets:");
        for target in &targets {
            match &target.description {
                Some(description) => println!("  {} - {}", target.name, description),
                None => println!("  {}", target.name),
            }
        }
    }

    if !parameters.is_empty() {
        println!("\nparameters:");
        for param in &parameters {
            let mut line = format!("  {}", param.name);
            if let Some(default) = &param.default {
                line.push_str(&format!(" (default: {})", default));
            }
            if param.required {
                line.push_str(" [required]");
            }
            println!("{}", line);
        }
    }

    if !properties.is_empty() {
        println!("\nproperties:");
        for property in properties.values() {
            match property.value.as_ref().or(property.default.as_ref()) {
                Some(value) => println!("  {} = {}", property.name, value),
                None => println!("  {}", property.name),
            }
        }
    }

    let imports: Vec<&ImportedModuleReport> = if include_imports {
        report.available_imported_modules()
    } else {
        report.imports.iter().collect()
    };
    if !imports.is_empty() {
        println!("\nimports:");
        for import in imports {
            let mut line = format!("  {} {}", import.mode.as_str(), import.module);
            if let Some(alias) = &import.alias {
                line.push_str(&format!(" as {}", alias));
            }
            if import.mandatory {
                line.push_str(" (mandatory)");
            }
            if import.report.is_none() {
                line.push_str(" [unavailable]");
            }
            println!("{}", line);
        }
    }
}
