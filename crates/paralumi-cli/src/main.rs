mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::run::RunArgs;
use paralumi_core::OperationKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "paralumi",
    about = "Run pulumi preview or up in parallel across every environment matching a config value",
    version,
    propagate_version = true
)]
struct Cli {
    /// Pulumi project directory (default: auto-detect from Pulumi.yaml)
    #[arg(long, global = true, env = "PARALUMI_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Output the report as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log backend invocations
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview changes on one stack per matching environment
    Preview(RunArgs),

    /// Apply changes on one stack per matching environment
    #[command(visible_alias = "up")]
    Apply(RunArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.work_dir.as_deref());

    let result = match cli.command {
        Commands::Preview(args) => cmd::run::run(&root, OperationKind::Preview, args, cli.json),
        Commands::Apply(args) => cmd::run::run(&root, OperationKind::Apply, args, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
