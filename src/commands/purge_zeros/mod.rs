//! Zero purge command
//!
//! This module follows the dependable-rust pattern:
//! - Public interface (this file): CLI arguments and entry point
//! - Internal implementation: all logic in internal.rs
//!
//! Scans every photometer's readings for sensor dropout (runs of zero
//! frequency at least one window long) and writes a transactional SQL script
//! deleting them. The database itself is never modified.
//!
//! # Example
//!
//! ```no_run
//! use tessutils::commands::purge_zeros::{self, PurgeZerosArgs};
//!
//! let args = PurgeZerosArgs {
//!     output: Some("purge_zeros.sql".into()),
//!     name: Some("stars1,stars2".to_string()),
//!     ..Default::default()
//! };
//! purge_zeros::execute(args)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod internal;

use anyhow::Result;
use std::path::PathBuf;

pub use internal::{build_settings, plan_and_write, DeviceSummary, FailedDevice, PurgeSummary};

/// Arguments of `tessutils purge-zeros`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PurgeZerosArgs {
    /// Output file to dump SQL statements
    #[arg(value_name = "SQL FILE")]
    pub output: Option<PathBuf>,

    /// SQLite database full file path
    #[arg(short, long)]
    pub dbase: Option<PathBuf>,

    /// Comma-separated list of photometer names for specific filtering
    #[arg(short, long)]
    pub name: Option<String>,

    /// Window depth: minimum zero run length treated as a dropout (odd, >= 3)
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Readings fetched per database query
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Photometers planned in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Configuration file (defaults to <config dir>/tessutils/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the purge from CLI arguments
pub fn execute(args: PurgeZerosArgs) -> Result<()> {
    let settings = build_settings(&args)?;
    let summary = plan_and_write(&settings)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        internal::print_summary(&summary);
    }

    if !summary.failed.is_empty() {
        let names: Vec<&str> = summary.failed.iter().map(|f| f.device.as_str()).collect();
        anyhow::bail!(
            "{} photometer(s) skipped because of bad readings: {}",
            names.len(),
            names.join(", ")
        );
    }
    Ok(())
}
