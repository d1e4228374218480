//! Fixed-depth FIFO of the most recent readings of one device

use std::collections::VecDeque;

use crate::error::{PurgeError, PurgeResult};
use crate::reading::Reading;

/// Window depth: odd and at least 3 so a unique center exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize(usize);

impl WindowSize {
    pub const DEFAULT: WindowSize = WindowSize(7);

    pub fn new(depth: usize) -> PurgeResult<Self> {
        if depth < 3 || depth % 2 == 0 {
            return Err(PurgeError::InvalidWindow(depth));
        }
        Ok(Self(depth))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Index of the center element, also the number of readings on each side of it
    pub fn half(self) -> usize {
        self.0 / 2
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone)]
pub struct WindowBuffer {
    size: WindowSize,
    items: VecDeque<Reading>,
}

impl WindowBuffer {
    pub fn new(size: WindowSize) -> Self {
        Self {
            size,
            items: VecDeque::with_capacity(size.get()),
        }
    }

    pub fn size(&self) -> WindowSize {
        self.size
    }

    /// Append a reading, returning the oldest one if it had to be evicted.
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        let evicted = if self.items.len() == self.size.get() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(reading);
        evicted
    }

    /// True while the window holds exactly N readings. Only `drain` at the
    /// end of a stream empties it again.
    pub fn is_full(&self) -> bool {
        self.items.len() == self.size.get()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Center reading, only defined once the window is full
    pub fn center(&self) -> Option<&Reading> {
        if self.is_full() {
            self.items.get(self.size.half())
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.items.iter()
    }

    pub fn frequency_sum(&self) -> f64 {
        self.items.iter().map(|r| r.frequency).sum()
    }

    /// Remove every buffered reading, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Reading> + '_ {
        self.items.drain(..)
    }
}
