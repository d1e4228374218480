//! Zero-run classifier
//!
//! A window's center reading is invalid only when every reading in the window
//! is zero. Frequencies are validated as non-negative before they reach the
//! window, so a zero sum means an all-zero window. An isolated zero among
//! valid readings is kept: the window depth is the minimum run length taken as
//! evidence that the photometer was actually down.

use serde::Serialize;

use super::window::WindowBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Keep,
    Discard,
}

impl Verdict {
    /// Marker used in diagnostic log lines
    pub fn mark(self) -> &'static str {
        match self {
            Verdict::Keep => "+++",
            Verdict::Discard => "---",
        }
    }
}

/// Classify the center of a full window. Returns `None` while filling.
pub fn classify(window: &WindowBuffer) -> Option<Verdict> {
    if !window.is_full() {
        return None;
    }
    if window.frequency_sum() == 0.0 {
        Some(Verdict::Discard)
    } else {
        Some(Verdict::Keep)
    }
}
