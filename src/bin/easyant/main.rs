//! easyant CLI - load modules, plan runs and describe imports

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use easyant::core::BuildError;
use easyant::util::diagnostic;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        match e.chain().find_map(|cause| cause.downcast_ref::<BuildError>()) {
            Some(build_err) => {
                let mut diag = build_err.to_diagnostic();
                diag.message = format!("{:#}", e);
                diagnostic::emit(&diag, color);
            }
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("easyant=debug")
    } else {
        EnvFilter::new("easyant=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let session = commands::Session::from_cli(&cli)?;

    // Execute command
    match cli.command {
        Commands::Load(args) => commands::load::execute(session, args),
        Commands::Plan(args) => commands::plan::execute(session, args),
        Commands::Describe(args) => commands::describe::execute(session, args),
    }
}
