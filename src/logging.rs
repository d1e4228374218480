//! Logging setup built on `tracing` and `tracing-subscriber`
//!
//! Diagnostics go to stderr, or to a log file when one is given, so the
//! human summary on stdout stays clean. `RUST_LOG` overrides the level
//! picked from the `--verbose`/`--quiet` flags.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging options from the command line
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    /// Append logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_file: None,
        }
    }
}

impl LogConfig {
    /// Level from the mutually exclusive verbose/quiet flags
    pub fn from_flags(verbose: bool, quiet: bool, log_file: Option<PathBuf>) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else if quiet {
            Level::WARN
        } else {
            Level::INFO
        };
        Self { level, log_file }
    }
}

/// Install the global subscriber.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init(config: &LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let (stderr_layer, file_layer) = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        }
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}
