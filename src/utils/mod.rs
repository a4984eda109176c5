//! Utility functions and helpers

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write, cleanup_temp_files, stage_write};
pub use time::{split_timestamp, weekday_label};
