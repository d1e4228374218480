//! Domain types for photometer readings
//!
//! These types are storage-agnostic - they don't know about SQLite.
//! Sources handle conversion from rows.

use serde::{Deserialize, Serialize};

use crate::error::{PurgeError, PurgeResult};

/// One stored photometer observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Date as YYYYMMDD
    pub date_id: i64,
    /// Time of day as HHMMSS
    pub time_id: i64,
    /// Numeric photometer id (`tess_id`)
    pub device_id: i64,
    /// Firmware counter, diagnostics only
    pub sequence_number: i64,
    pub frequency: f64,
    pub magnitude: Option<f64>,
}

/// Compound primary key of a stored reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReadingKey {
    pub date_id: i64,
    pub time_id: i64,
    pub device_id: i64,
}

impl Reading {
    /// Ordering key within a device stream
    pub fn timestamp(&self) -> (i64, i64) {
        (self.date_id, self.time_id)
    }

    pub fn key(&self) -> ReadingKey {
        ReadingKey {
            date_id: self.date_id,
            time_id: self.time_id,
            device_id: self.device_id,
        }
    }

    /// Reject values the zero-run rule cannot reason about.
    ///
    /// Frequencies are photon-count rates and must be finite and non-negative,
    /// otherwise a window could sum to zero without being all zeros.
    pub fn validate(&self, device: &str) -> PurgeResult<()> {
        let reason = if !self.frequency.is_finite() {
            Some(format!("frequency {} is not a finite number", self.frequency))
        } else if self.frequency < 0.0 {
            Some(format!("frequency {} is negative", self.frequency))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(self.malformed(device, reason)),
            None => Ok(()),
        }
    }

    pub(crate) fn malformed(&self, device: &str, reason: String) -> PurgeError {
        PurgeError::MalformedReading {
            device: device.to_string(),
            date_id: self.date_id,
            time_id: self.time_id,
            reason,
        }
    }
}

#[cfg(test)]
pub(crate) fn reading(seq: i64, frequency: f64) -> Reading {
    // One reading per minute starting at midnight, all on the same night.
    Reading {
        date_id: 20190315,
        time_id: (seq / 60) * 10000 + (seq % 60) * 100,
        device_id: 1,
        sequence_number: seq,
        frequency,
        magnitude: None,
    }
}
