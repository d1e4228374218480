//! Zero-run detection and purge planning
//!
//! Photometers report a frequency of exactly zero when the sensor drops out.
//! A dropout shows up as a contiguous run of zero readings; a lone zero inside
//! otherwise valid traffic is legitimate and must survive.
//!
//! The pipeline per device is:
//! - [`WindowBuffer`]: fixed-depth FIFO of the latest readings
//! - [`classify`]: all-zero window ⇒ its center reading is discarded
//! - [`DevicePlanner`]: filling / sliding / flushing state machine
//! - [`PurgePlanner`]: runs every device and gathers a [`DeletionPlan`]
//!
//! # Example
//! ```
//! use tessutils::purge::{plan_device, WindowSize};
//! use tessutils::Reading;
//!
//! let readings = (0..9).map(|seq| {
//!     Ok(Reading {
//!         date_id: 20190315,
//!         time_id: seq * 100,
//!         device_id: 1,
//!         sequence_number: seq,
//!         frequency: 0.0,
//!         magnitude: None,
//!     })
//! });
//! let plan = plan_device("stars1", readings, WindowSize::DEFAULT)?;
//! assert_eq!(plan.deletions.len(), 3);
//! # Ok::<(), tessutils::PurgeError>(())
//! ```

mod classifier;
mod planner;
mod window;

pub use classifier::{classify, Verdict};
pub use planner::{
    plan_device, DeletionPlan, DeviceFailure, DevicePlan, DevicePlanner, Phase, PlannedDeletion,
    PurgePlanner, PurgeRun,
};
pub use window::{WindowBuffer, WindowSize};
