//! Internal implementation for the zero purge command

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{info, warn};

use super::PurgeZerosArgs;
use crate::config::{parse_names, ConfigFile, PurgeSettings};
use crate::db::SqliteSource;
use crate::purge::{PurgePlanner, PurgeRun};
use crate::script;
use crate::source::ReadingSource;

// ============================================================================
// Data Structures
// ============================================================================

/// Run report, printed as text or JSON
#[derive(Debug, Clone, Serialize)]
pub struct PurgeSummary {
    pub generated_at: DateTime<Utc>,
    pub database: PathBuf,
    pub output: PathBuf,
    pub window: usize,
    pub devices: Vec<DeviceSummary>,
    pub failed: Vec<FailedDevice>,
    pub total_readings: usize,
    pub total_deleted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub device: String,
    pub readings: usize,
    pub evaluated: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDevice {
    pub device: String,
    pub error: String,
}

// ============================================================================
// Settings
// ============================================================================

/// Merge the config file with command line flags and validate the result.
pub fn build_settings(args: &PurgeZerosArgs) -> Result<PurgeSettings> {
    let mut config = ConfigFile::load(args.config.as_deref())?.purge;

    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(dbase) = &args.dbase {
        config.database = dbase.clone();
    }
    if let Some(names) = &args.name {
        config.devices = parse_names(names);
    }
    if let Some(window) = args.window {
        config.window = window;
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }

    config.resolve().context("Invalid purge configuration")
}

// ============================================================================
// Run
// ============================================================================

/// Plan every requested photometer and write the deletion script.
///
/// The script is only written once all devices are planned. Devices with
/// bad readings are left out of the script and listed in the summary.
pub fn plan_and_write(settings: &PurgeSettings) -> Result<PurgeSummary> {
    info!("Opening database {}", settings.database.display());
    let catalog = SqliteSource::open(&settings.database, settings.page_size)
        .context("Failed to open TESS database")?
        .devices()
        .context("Failed to list photometers")?;

    let devices = select_devices(&catalog, &settings.devices);
    info!(
        "Scanning {} photometer(s) with window depth {}",
        devices.len(),
        settings.window.get()
    );

    let planner = PurgePlanner::new(settings.window).with_jobs(settings.jobs);
    let run = planner
        .run_with(
            || SqliteSource::open(&settings.database, settings.page_size),
            &devices,
        )
        .context("Failed to read photometer readings")?;

    script::write_script(&settings.output, &run.plan)
        .with_context(|| format!("Failed to write {}", settings.output.display()))?;
    info!(
        "Wrote {} deletion(s) to {}",
        run.plan.len(),
        settings.output.display()
    );

    Ok(summarize(settings, &run))
}

/// Restrict to the allow-list when one is given, warning on unknown names.
fn select_devices(catalog: &[String], allow: &[String]) -> Vec<String> {
    if allow.is_empty() {
        return catalog.to_vec();
    }
    let known: BTreeSet<&str> = catalog.iter().map(String::as_str).collect();
    for name in allow.iter().filter(|n| !known.contains(n.as_str())) {
        warn!("[{}] not found in the photometer catalog", name);
    }
    allow.to_vec()
}

fn summarize(settings: &PurgeSettings, run: &PurgeRun) -> PurgeSummary {
    let devices: Vec<DeviceSummary> = run
        .plan
        .devices
        .iter()
        .map(|d| DeviceSummary {
            device: d.device.clone(),
            readings: d.readings_seen,
            evaluated: d.evaluated,
            deleted: d.deletions.len(),
        })
        .collect();
    let failed = run
        .failures
        .iter()
        .map(|f| FailedDevice {
            device: f.device.clone(),
            error: f.error.to_string(),
        })
        .collect();

    PurgeSummary {
        generated_at: Utc::now(),
        database: settings.database.clone(),
        output: settings.output.clone(),
        window: settings.window.get(),
        total_readings: devices.iter().map(|d| d.readings).sum(),
        total_deleted: run.plan.len(),
        devices,
        failed,
    }
}

pub(super) fn print_summary(summary: &PurgeSummary) {
    println!("{}", "TESS zero purge".bold());
    println!("Database: {}", summary.database.display());
    println!("Window:   {}", summary.window);
    println!();

    for device in &summary.devices {
        let deleted = if device.deleted > 0 {
            device.deleted.to_string().yellow()
        } else {
            device.deleted.to_string().green()
        };
        println!(
            "  {:<12} {:>9} readings  {:>6} deleted",
            device.device, device.readings, deleted
        );
    }
    for failure in &summary.failed {
        println!("  {:<12} {} {}", failure.device, "skipped:".red().bold(), failure.error);
    }

    println!();
    println!(
        "{} deletion(s) out of {} readings written to {}",
        summary.total_deleted,
        summary.total_readings,
        summary.output.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_devices_without_allow_list() {
        let catalog = vec!["stars1".to_string(), "stars2".to_string()];
        assert_eq!(select_devices(&catalog, &[]), catalog);
    }

    #[test]
    fn test_select_devices_keeps_unknown_names() {
        let catalog = vec!["stars1".to_string(), "stars2".to_string()];
        let allow = vec!["stars2".to_string(), "stars99".to_string()];
        assert_eq!(select_devices(&catalog, &allow), allow);
    }

    #[test]
    fn test_build_settings_cli_overrides() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let config = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(config.path(), "[purge]\nwindow = 9\njobs = 2\n").unwrap();

        let args = PurgeZerosArgs {
            output: Some(PathBuf::from("out.sql")),
            dbase: Some(db.path().to_path_buf()),
            name: Some("stars2,stars1".to_string()),
            jobs: Some(4),
            config: Some(config.path().to_path_buf()),
            ..Default::default()
        };
        let settings = build_settings(&args).unwrap();
        assert_eq!(settings.window.get(), 9);
        assert_eq!(settings.jobs, 4);
        assert_eq!(settings.devices, vec!["stars1", "stars2"]);
        assert_eq!(settings.output, PathBuf::from("out.sql"));
    }

    #[test]
    fn test_build_settings_rejects_even_window() {
        let db = tempfile::NamedTempFile::new().unwrap();
        let config = tempfile::NamedTempFile::new().unwrap();
        let args = PurgeZerosArgs {
            output: Some(PathBuf::from("out.sql")),
            dbase: Some(db.path().to_path_buf()),
            window: Some(8),
            config: Some(config.path().to_path_buf()),
            ..Default::default()
        };
        assert!(build_settings(&args).is_err());
    }
}
