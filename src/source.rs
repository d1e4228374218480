//! Reading sources feeding the purge planner

use std::collections::BTreeMap;

use crate::error::PurgeResult;
use crate::reading::Reading;

/// Lazy iterator over one device stream
pub type ReadingIter<'a> = Box<dyn Iterator<Item = PurgeResult<Reading>> + 'a>;

/// Ordered access to stored readings, one device stream at a time
pub trait ReadingSource {
    /// Every known device name, ascending
    fn devices(&self) -> PurgeResult<Vec<String>>;

    /// Readings of one device sorted by `(date_id, time_id)`.
    ///
    /// An unknown device yields an empty stream.
    fn readings<'a>(&'a self, device: &str) -> PurgeResult<ReadingIter<'a>>;
}

/// Readings held in memory, keyed by device name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    streams: BTreeMap<String, Vec<Reading>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append readings to a device stream, keeping insertion order.
    pub fn insert(&mut self, device: impl Into<String>, readings: impl IntoIterator<Item = Reading>) {
        self.streams
            .entry(device.into())
            .or_default()
            .extend(readings);
    }

    pub fn with_device(mut self, device: impl Into<String>, readings: Vec<Reading>) -> Self {
        self.insert(device, readings);
        self
    }
}

impl ReadingSource for MemorySource {
    fn devices(&self) -> PurgeResult<Vec<String>> {
        Ok(self.streams.keys().cloned().collect())
    }

    fn readings<'a>(&'a self, device: &str) -> PurgeResult<ReadingIter<'a>> {
        let stream = self.streams.get(device).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Box::new(stream.iter().cloned().map(Ok)))
    }
}
