//! Renders a deletion plan as a transactional SQL script
//!
//! The script is rendered completely in memory and then moved into place, so
//! an interrupted run never leaves a half-written transaction behind.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PurgeResult;
use crate::purge::{DeletionPlan, PlannedDeletion};

pub const READINGS_TABLE: &str = "tess_readings_t";

/// Render the full script text.
pub fn render(plan: &DeletionPlan) -> String {
    let mut out = String::from("BEGIN TRANSACTION;\n");
    for device in &plan.devices {
        // Infallible: writing into a String.
        let _ = writeln!(
            out,
            "-- deleting {} invalid readings from {}",
            device.deletions.len(),
            device.device
        );
        for deletion in &device.deletions {
            out.push_str(&render_deletion(&device.device, deletion));
        }
    }
    out.push_str("COMMIT;\n");
    out
}

/// Comment line plus `DELETE` statement for one reading
pub fn render_deletion(device: &str, deletion: &PlannedDeletion) -> String {
    let key = deletion.key;
    let magnitude = deletion
        .magnitude
        .map_or_else(|| "-".to_string(), |m| m.to_string());
    format!(
        "-- [{}] seq {} freq {} mag {} at {:08}T{:06}\n\
         DELETE FROM {} WHERE date_id == {} AND time_id == {} AND tess_id == {};\n",
        device,
        deletion.sequence_number,
        deletion.frequency,
        magnitude,
        key.date_id,
        key.time_id,
        READINGS_TABLE,
        key.date_id,
        key.time_id,
        key.device_id
    )
}

/// Write the script for `plan` to `path`, replacing any previous file.
pub fn write_script(path: &Path, plan: &DeletionPlan) -> PurgeResult<()> {
    let script = render(plan);
    let tmp = temporary_path(path);
    fs::write(&tmp, script)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "purge.sql".into());
    name.push(".partial");
    path.with_file_name(name)
}
