//! Utility functions

pub mod text;
pub mod time;

pub use text::truncate_utf8;
pub use time::{cooldown_cutoff, format_milliseconds, now_utc};
