//! Purge planner: drives the classifier over each device stream
//!
//! Each device gets its own [`DevicePlanner`], created on the first reading
//! and consumed by [`DevicePlanner::finish`] when the stream ends. Buffers are
//! never shared between devices, so a window can never straddle two streams.
//!
//! Boundary policy: the first and last `N/2` readings of a stream are never a
//! window center. They are always kept, since there are too few neighbours on
//! one side to confirm a genuine run.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::classifier::{classify, Verdict};
use super::window::{WindowBuffer, WindowSize};
use crate::error::{PurgeError, PurgeResult};
use crate::reading::{Reading, ReadingKey};
use crate::source::ReadingSource;

/// Lifecycle of one device stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accumulating readings, no decisions yet
    Filling,
    /// Window full, one decision per new reading
    Sliding,
    /// Stream exhausted, retiring the buffered tail
    Flushing,
}

/// A reading selected for deletion, with its diagnostic values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedDeletion {
    pub key: ReadingKey,
    pub sequence_number: i64,
    pub frequency: f64,
    pub magnitude: Option<f64>,
}

impl From<&Reading> for PlannedDeletion {
    fn from(reading: &Reading) -> Self {
        Self {
            key: reading.key(),
            sequence_number: reading.sequence_number,
            frequency: reading.frequency,
            magnitude: reading.magnitude,
        }
    }
}

/// Result of planning one device stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicePlan {
    pub device: String,
    pub readings_seen: usize,
    pub evaluated: usize,
    /// Readings at either end of the stream that were never a window center
    pub boundary_kept: usize,
    pub deletions: Vec<PlannedDeletion>,
}

/// Deletions for a whole run, ordered by device then by time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionPlan {
    pub devices: Vec<DevicePlan>,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.devices.iter().map(|d| d.deletions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All deletions with the name of their device stream
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlannedDeletion)> {
        self.devices
            .iter()
            .flat_map(|d| d.deletions.iter().map(move |del| (d.device.as_str(), del)))
    }

    pub fn device(&self, name: &str) -> Option<&DevicePlan> {
        self.devices.iter().find(|d| d.device == name)
    }
}

/// Per-device state machine
#[derive(Debug)]
pub struct DevicePlanner {
    device: String,
    window: WindowBuffer,
    phase: Phase,
    last_timestamp: Option<(i64, i64)>,
    readings_seen: usize,
    evaluated: usize,
    deletions: Vec<PlannedDeletion>,
}

impl DevicePlanner {
    pub fn new(device: impl Into<String>, size: WindowSize) -> Self {
        Self {
            device: device.into(),
            window: WindowBuffer::new(size),
            phase: Phase::Filling,
            last_timestamp: None,
            readings_seen: 0,
            evaluated: 0,
            deletions: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Feed the next reading of the stream.
    ///
    /// Returns the verdict on the window center once the window is full.
    /// Fails on malformed values or on a timestamp earlier than the previous
    /// reading; the caller must then abandon this device.
    pub fn feed(&mut self, reading: Reading) -> PurgeResult<Option<Verdict>> {
        reading.validate(&self.device)?;
        let timestamp = reading.timestamp();
        if let Some(prev) = self.last_timestamp {
            if timestamp < prev {
                return Err(PurgeError::OutOfOrder {
                    device: self.device.clone(),
                    prev_date: prev.0,
                    prev_time: prev.1,
                    found_date: timestamp.0,
                    found_time: timestamp.1,
                });
            }
        }
        self.last_timestamp = Some(timestamp);
        self.readings_seen += 1;
        self.window.push(reading);

        if self.phase == Phase::Filling {
            if !self.window.is_full() {
                debug!("[{}] Refilling the buffer", self.device);
                return Ok(None);
            }
            self.phase = Phase::Sliding;
        }

        let Some(verdict) = classify(&self.window) else {
            return Ok(None);
        };
        if let Some(center) = self.window.center() {
            trace_reading(&self.device, center, verdict.mark());
            if verdict == Verdict::Discard {
                self.deletions.push(PlannedDeletion::from(center));
            }
        }
        self.evaluated += 1;
        Ok(Some(verdict))
    }

    /// End of stream: retire the buffer and hand back the device plan.
    pub fn finish(mut self) -> DevicePlan {
        self.phase = Phase::Flushing;
        let was_full = self.window.is_full();
        let half = self.window.size().half();
        let buffered = self.window.len();
        // Readings up to and including the last center were already decided.
        let decided = if was_full { buffered - half } else { 0 };

        let mut boundary_kept = 0;
        for (i, reading) in self.window.drain().enumerate() {
            if i < decided {
                debug!(
                    "[{}] ({:02}) [{:08}T{:06}] [{:06}] already evaluated",
                    self.device,
                    reading.device_id,
                    reading.date_id,
                    reading.time_id,
                    reading.sequence_number
                );
            } else {
                trace_reading(&self.device, &reading, "+++ (tail)");
                boundary_kept += 1;
            }
        }
        // The first N/2 readings left the window without ever being its center.
        if was_full {
            boundary_kept += half;
        }

        debug!(
            "[{}] {:?}: {} readings, {} evaluated, {} deleted",
            self.device,
            self.phase,
            self.readings_seen,
            self.evaluated,
            self.deletions.len()
        );

        DevicePlan {
            device: self.device,
            readings_seen: self.readings_seen,
            evaluated: self.evaluated,
            boundary_kept,
            deletions: self.deletions,
        }
    }
}

fn trace_reading(device: &str, reading: &Reading, mark: &str) {
    info!(
        "[{}] ({:02}) [{:08}T{:06}] [{:06}] f={}, m={} -> {}",
        device,
        reading.device_id,
        reading.date_id,
        reading.time_id,
        reading.sequence_number,
        reading.frequency,
        reading
            .magnitude
            .map_or_else(|| "-".to_string(), |m| m.to_string()),
        mark
    );
}

/// Plan a complete device stream.
pub fn plan_device<I>(device: &str, readings: I, size: WindowSize) -> PurgeResult<DevicePlan>
where
    I: IntoIterator<Item = PurgeResult<Reading>>,
{
    let mut planner = DevicePlanner::new(device, size);
    for reading in readings {
        planner.feed(reading?)?;
    }
    Ok(planner.finish())
}

/// A device whose stream was rejected
#[derive(Debug)]
pub struct DeviceFailure {
    pub device: String,
    pub error: PurgeError,
}

/// Outcome of a planning run over several devices
#[derive(Debug, Default)]
pub struct PurgeRun {
    pub plan: DeletionPlan,
    pub failures: Vec<DeviceFailure>,
}

/// Multi-device orchestration
#[derive(Debug, Clone, Copy)]
pub struct PurgePlanner {
    window: WindowSize,
    jobs: usize,
}

impl PurgePlanner {
    pub fn new(window: WindowSize) -> Self {
        Self { window, jobs: 1 }
    }

    /// Number of devices planned concurrently (minimum 1)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Plan the given devices one after another from a single source.
    ///
    /// Devices are processed in ascending name order regardless of input
    /// order. Malformed or unsorted streams are reported as failures and
    /// contribute no deletions; source errors abort the whole run.
    pub fn run<S: ReadingSource + ?Sized>(
        &self,
        source: &S,
        devices: &[String],
    ) -> PurgeResult<PurgeRun> {
        let outcomes = normalize(devices)
            .into_iter()
            .map(|device| {
                let result = source
                    .readings(&device)
                    .and_then(|readings| plan_device(&device, readings, self.window));
                (device, result)
            })
            .collect();
        collect_run(outcomes)
    }

    /// Plan devices on a thread pool.
    ///
    /// A source is opened once per rayon work split and reused for every
    /// device of that split, not once per device. Output is identical to
    /// [`PurgePlanner::run`]: results are gathered in device-name order
    /// independently of scheduling.
    pub fn run_parallel<S, F>(&self, open: F, devices: &[String]) -> PurgeResult<PurgeRun>
    where
        S: ReadingSource,
        F: Fn() -> PurgeResult<S> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| PurgeError::InvalidConfig(format!("cannot build thread pool: {e}")))?;

        let devices = normalize(devices);
        let outcomes = pool.install(|| {
            devices
                .into_par_iter()
                .map_init(&open, |source, device| {
                    let result = match source {
                        Ok(source) => source
                            .readings(&device)
                            .and_then(|readings| plan_device(&device, readings, self.window)),
                        Err(e) => Err(PurgeError::InvalidConfig(format!(
                            "cannot open reading source: {e}"
                        ))),
                    };
                    (device, result)
                })
                .collect::<Vec<_>>()
        });
        collect_run(outcomes)
    }

    /// Pick sequential or parallel execution from the configured job count.
    pub fn run_with<S, F>(&self, open: F, devices: &[String]) -> PurgeResult<PurgeRun>
    where
        S: ReadingSource,
        F: Fn() -> PurgeResult<S> + Sync,
    {
        if self.jobs > 1 && devices.len() > 1 {
            self.run_parallel(open, devices)
        } else {
            let source = open()?;
            self.run(&source, devices)
        }
    }
}

fn normalize(devices: &[String]) -> Vec<String> {
    let mut devices = devices.to_vec();
    devices.sort();
    devices.dedup();
    devices
}

fn collect_run(outcomes: Vec<(String, PurgeResult<DevicePlan>)>) -> PurgeResult<PurgeRun> {
    let mut run = PurgeRun::default();
    for (device, result) in outcomes {
        match result {
            Ok(plan) => run.plan.devices.push(plan),
            Err(error) if error.is_per_device() => {
                tracing::error!("[{}] device skipped: {}", device, error);
                run.failures.push(DeviceFailure { device, error });
            }
            Err(error) => return Err(error),
        }
    }
    Ok(run)
}
