//! Configuration for the purge command
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML
//! file (`<config dir>/tessutils/config.toml` or `--config`), and CLI flags.
//!
//! ```toml
//! [purge]
//! database = "~/dbase/tess.db"
//! window = 7
//! page_size = 500
//! jobs = 4
//! devices = ["stars1", "stars2"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::DEFAULT_PAGE_SIZE;
use crate::error::{PurgeError, PurgeResult};
use crate::purge::WindowSize;

pub const DEFAULT_DATABASE: &str = "/var/dbase/tess.db";

/// Whole configuration file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub purge: PurgeConfig,
}

/// `[purge]` section, unvalidated
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PurgeConfig {
    /// SQLite database file
    pub database: PathBuf,
    /// Script file to generate
    pub output: Option<PathBuf>,
    /// Window depth, i.e. minimum zero run length
    pub window: usize,
    /// Readings fetched per database query
    pub page_size: usize,
    /// Devices planned concurrently
    pub jobs: usize,
    /// Restrict the run to these photometer names (empty = all)
    pub devices: Vec<String>,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            output: None,
            window: WindowSize::DEFAULT.get(),
            page_size: DEFAULT_PAGE_SIZE,
            jobs: 1,
            devices: Vec::new(),
        }
    }
}

/// Validated settings ready for a run
#[derive(Debug, Clone)]
pub struct PurgeSettings {
    pub database: PathBuf,
    pub output: PathBuf,
    pub window: WindowSize,
    pub page_size: usize,
    pub jobs: usize,
    pub devices: Vec<String>,
}

impl ConfigFile {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tessutils").join("config.toml"))
    }

    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::load_from_str(&content)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    /// Load configuration from string
    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Load an explicit file, else the default file if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from_file(path),
            _ => Ok(Self::default()),
        }
    }
}

impl PurgeConfig {
    /// Check every value before any processing starts
    pub fn resolve(self) -> PurgeResult<PurgeSettings> {
        let window = WindowSize::new(self.window)?;
        if self.page_size == 0 {
            return Err(PurgeError::InvalidConfig(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.jobs == 0 {
            return Err(PurgeError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }

        let database = expand_path(&self.database);
        if !database.is_file() {
            return Err(PurgeError::InvalidConfig(format!(
                "no SQLite database file found at {}",
                database.display()
            )));
        }
        let output = self
            .output
            .as_deref()
            .map(expand_path)
            .ok_or_else(|| PurgeError::InvalidConfig("no output file given".to_string()))?;

        Ok(PurgeSettings {
            database,
            output,
            window,
            page_size: self.page_size,
            jobs: self.jobs,
            devices: normalize_names(self.devices),
        })
    }
}

/// Split a comma separated list of photometer names.
pub fn parse_names(list: &str) -> Vec<String> {
    normalize_names(list.split(',').map(str::to_string))
}

fn normalize_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
