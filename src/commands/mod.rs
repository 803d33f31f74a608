pub mod archive;
pub mod classes;
pub mod events;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use planner_core::event::RECORD_DATETIME_FORMAT;

/// Parse a "YYYY-MM-DD HH:MM" command-line time.
pub fn parse_at(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), RECORD_DATETIME_FORMAT)
        .with_context(|| format!("Could not parse time \"{}\". Expected YYYY-MM-DD HH:MM", input))
}
