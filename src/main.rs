use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tessutils::commands;
use tessutils::logging::{self, LogConfig};

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Maintenance utilities for the TESS photometer network database", long_about = None)]
struct Cli {
    /// Verbose logging output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet logging output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log to file instead of the console
    #[arg(short, long, global = true, value_name = "FILE PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a SQL script deleting sensor dropout (zero frequency) readings
    PurgeZeros {
        #[command(flatten)]
        args: commands::purge_zeros::PurgeZerosArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogConfig::from_flags(cli.verbose, cli.quiet, cli.log_file))?;
    tracing::info!(
        "============== tessutils {} ==============",
        env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        Commands::PurgeZeros { args } => {
            commands::purge_zeros::execute(args)?;
        }
    }

    Ok(())
}
