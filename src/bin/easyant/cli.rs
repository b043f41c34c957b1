//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// easyant - plugin and build-type composition for a target-based build tool
#[derive(Parser)]
#[command(name = "easyant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Active build configurations (comma-separated)
    #[arg(long, global = true, env = "EASYANT_CONF")]
    pub conf: Option<String>,

    /// Set a project property (`-D key=value`)
    #[arg(short = 'D', global = true, value_name = "KEY=VALUE", value_parser = parse_define)]
    pub define: Vec<(String, String)>,

    /// Only use the download cache
    #[arg(long, global = true)]
    pub offline: bool,

    /// Module repository directory
    #[arg(long, global = true, env = "EASYANT_REPOSITORY")]
    pub repository: Option<PathBuf>,

    /// Download cache directory
    #[arg(long, global = true)]
    pub cache: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load the module and show phases with their bound targets
    Load(LoadArgs),

    /// Show the targets a run would execute, in order
    Plan(PlanArgs),

    /// Describe the module and everything it imports
    Describe(DescribeArgs),
}

#[derive(Args)]
pub struct LoadArgs {
    /// Also list targets bound to no phase
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Target to plan (defaults to the module's default target)
    pub target: Option<String>,
}

#[derive(Args)]
pub struct DescribeArgs {
    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only show the module's own items, not those of its imports
    #[arg(long)]
    pub no_imports: bool,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected `key=value`, found `{}`", s)),
    }
}
