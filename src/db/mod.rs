//! Database access for tessutils
//!
//! Read-only SQLite wrapper over the photometer readings database.
//! The purge never mutates the database; it only emits a script.
//!
//! # Example
//! ```no_run
//! use tessutils::db::SqliteSource;
//! use tessutils::source::ReadingSource;
//!
//! let db = SqliteSource::open("/var/dbase/tess.db", 500)?;
//! for name in db.devices()? {
//!     println!("{name}");
//! }
//! # Ok::<(), tessutils::PurgeError>(())
//! ```

pub mod sqlite;

pub use sqlite::{SqliteSource, DEFAULT_PAGE_SIZE};
