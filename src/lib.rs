pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod purge;
pub mod reading;
pub mod script;
pub mod source;

// Re-export commonly used types
pub use error::{PurgeError, PurgeResult};
pub use purge::{DeletionPlan, PurgePlanner, WindowSize};
pub use reading::{Reading, ReadingKey};
