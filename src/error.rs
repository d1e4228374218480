//! Error types for the purge library.
//!
//! Library code returns [`PurgeError`]; the command layer wraps it in
//! `anyhow` with context for whole-run failures.

use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type PurgeResult<T> = std::result::Result<T, PurgeError>;

#[derive(Error, Debug)]
pub enum PurgeError {
    #[error("window depth must be odd and at least 3, got {0}")]
    InvalidWindow(usize),

    #[error("configuration error: {0}")]
    InvalidConfig(String),

    #[error(
        "[{device}] reading {found_date:08}T{found_time:06} arrived after \
         {prev_date:08}T{prev_time:06}; input must be sorted by date and time"
    )]
    OutOfOrder {
        device: String,
        prev_date: i64,
        prev_time: i64,
        found_date: i64,
        found_time: i64,
    },

    #[error("[{device}] malformed reading at {date_id:08}T{time_id:06}: {reason}")]
    MalformedReading {
        device: String,
        date_id: i64,
        time_id: i64,
        reason: String,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PurgeError {
    /// True for errors that only invalidate a single device stream.
    pub fn is_per_device(&self) -> bool {
        matches!(
            self,
            PurgeError::OutOfOrder { .. } | PurgeError::MalformedReading { .. }
        )
    }
}
