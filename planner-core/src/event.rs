//! Event entity and its single-line record codec.
//!
//! A record is four `|`-delimited fields:
//!
//! ```text
//! className|eventName|YYYY-MM-DD HH:MM|description
//! ```
//!
//! Backslash, `|` and line breaks inside a field are escaped on encode
//! (`\\`, `\|`, `\n`, `\r`). Decoding keeps unknown escape sequences
//! literally, so older files that never escaped anything still load.

use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

/// Field delimiter of a record.
pub const DELIMITER: char = '|';

/// Date-time layout inside a record (24-hour, no locale).
pub const RECORD_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Date layout used for display and for the composite identity, e.g. "March 19, 2025".
pub const DISPLAY_DATE_FORMAT: &str = "%B %-d, %Y";

/// Time layout used for display, e.g. "9:05 AM".
pub const DISPLAY_TIME_FORMAT: &str = "%-I:%M %p";

const EMPTY_DESCRIPTION: &str = "Description is empty";

/// A scheduled item belonging to a class.
///
/// Records store the time to the minute. A value built as a struct literal
/// may carry seconds; [`Event::at_minute_precision`] gives the value a
/// store round-trip produces, and the planner applies it on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub class_name: String,
    pub event_name: String,
    /// Minute precision; seconds are dropped by [`Event::new`].
    pub date_time: NaiveDateTime,
    pub description: String,
}

impl Event {
    pub fn new(
        class_name: impl Into<String>,
        event_name: impl Into<String>,
        date_time: NaiveDateTime,
        description: impl Into<String>,
    ) -> Self {
        Event {
            class_name: class_name.into(),
            event_name: event_name.into(),
            date_time: truncate_to_minute(date_time),
            description: description.into(),
        }
    }

    /// The same event with seconds and sub-seconds dropped.
    pub fn at_minute_precision(mut self) -> Self {
        self.date_time = truncate_to_minute(self.date_time);
        self
    }

    /// Date as shown to users, e.g. "March 19, 2025".
    pub fn date_formatted(&self) -> String {
        self.date_time.format(DISPLAY_DATE_FORMAT).to_string()
    }

    /// Time as shown to users, e.g. "9:05 AM".
    pub fn time_formatted(&self) -> String {
        self.date_time.format(DISPLAY_TIME_FORMAT).to_string()
    }

    /// Text for a "view details" panel.
    pub fn description_detail(&self) -> &str {
        if self.description.trim().is_empty() {
            EMPTY_DESCRIPTION
        } else {
            &self.description
        }
    }

    pub fn identity(&self) -> EventIdentity {
        EventIdentity::of(self)
    }

    /// Whether the event has elapsed at `now`. An event scheduled exactly
    /// at `now` counts as past.
    pub fn is_past(&self, now: NaiveDateTime) -> bool {
        self.date_time <= now
    }

    pub fn belongs_to(&self, class_name: &str) -> bool {
        names_match(&self.class_name, class_name)
    }

    /// Case-insensitive event name check.
    pub fn is_named(&self, event_name: &str) -> bool {
        names_match(&self.event_name, event_name)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} - {} - {}",
            self.class_name,
            self.event_name,
            self.date_formatted()
        )
    }
}

/// Composite key used to locate one event: class, event name and the
/// display-formatted date. Names compare case-insensitively, the date exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventIdentity {
    pub class_name: String,
    pub event_name: String,
    pub date: String,
}

impl EventIdentity {
    pub fn new(
        class_name: impl Into<String>,
        event_name: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        EventIdentity {
            class_name: class_name.into(),
            event_name: event_name.into(),
            date: date.into(),
        }
    }

    pub fn of(event: &Event) -> Self {
        EventIdentity {
            class_name: event.class_name.clone(),
            event_name: event.event_name.clone(),
            date: event.date_formatted(),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        names_match(&event.class_name, &self.class_name)
            && names_match(&event.event_name, &self.event_name)
            && event.date_formatted() == self.date
    }
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} / {} / {}", self.class_name, self.event_name, self.date)
    }
}

/// Case-insensitive name comparison shared by identity, cascade and rename.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn truncate_to_minute(date_time: NaiveDateTime) -> NaiveDateTime {
    date_time
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(date_time)
}

/// Render an event as one record line (without the trailing newline).
pub fn encode(event: &Event) -> String {
    let date_time = event.date_time.format(RECORD_DATETIME_FORMAT).to_string();
    [
        escape_field(&event.class_name),
        escape_field(&event.event_name),
        date_time,
        escape_field(&event.description),
    ]
    .join(&DELIMITER.to_string())
}

/// Parse one record line.
///
/// Fewer than three fields or an unparseable date-time yields
/// [`PlannerError::MalformedRecord`]. A missing description becomes empty.
/// More than four fields can only come from files written before escaping
/// was introduced; the extra fields are joined back into the description.
pub fn decode(line: &str) -> PlannerResult<Event> {
    let record = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = split_fields(record);

    if fields.len() < 3 {
        return Err(PlannerError::malformed(
            record,
            format!("expected at least 3 fields, found {}", fields.len()),
        ));
    }

    let description = if fields.len() > 3 {
        fields.split_off(3).join(&DELIMITER.to_string())
    } else {
        String::new()
    };

    let date_time = NaiveDateTime::parse_from_str(fields[2].trim(), RECORD_DATETIME_FORMAT)
        .map_err(|e| PlannerError::malformed(record, format!("invalid date-time: {e}")))?;

    let mut fields = fields.into_iter();
    let class_name = fields.next().unwrap_or_default();
    let event_name = fields.next().unwrap_or_default();

    Ok(Event::new(class_name, event_name, date_time, description))
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            DELIMITER => out.push_str("\\|"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Split on unescaped delimiters, unescaping as we go. Empty fields are kept.
fn split_fields(record: &str) -> Vec<String> {
    let mut fields = Vec::with_capacity(4);
    let mut current = String::new();
    let mut chars = record.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some(DELIMITER) => current.push(DELIMITER),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            DELIMITER => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);

    fields
}
