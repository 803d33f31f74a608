//! Terminal rendering for planner types.
//!
//! Extension traits that add colored output to planner-core types using
//! owo_colors.

use chrono::{Local, NaiveDate};
use owo_colors::OwoColorize;
use planner_core::Event;

/// Extension trait for colored terminal rendering.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Event {
    fn render(&self) -> String {
        let time = format!("{:>8}", self.time_formatted());
        let class_tag = format!("[{}]", self.class_name);
        format!("{} {} {}", time, self.event_name, class_tag.dimmed())
    }
}

/// Full detail block for a single event.
pub fn render_detail(event: &Event) -> Vec<String> {
    let description = if event.description.trim().is_empty() {
        event.description_detail().dimmed().to_string()
    } else {
        event.description_detail().to_string()
    };

    vec![
        event.event_name.bold().to_string(),
        format!("  {}  {}", "Class".dimmed(), event.class_name),
        format!("  {}   {}", "Date".dimmed(), event.date_formatted()),
        format!("  {}   {}", "Time".dimmed(), event.time_formatted()),
        format!("  {}", description),
    ]
}

/// Render events grouped under day headings, in the order given.
pub fn render_by_day(events: &[Event]) -> Vec<String> {
    let today = Local::now().date_naive();
    let mut lines = Vec::new();
    let mut current_date: Option<String> = None;

    for event in events {
        let date_label = format_date_label(event.date_time.date(), today);

        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                lines.push(String::new());
            }
            lines.push(date_label.bold().to_string());
            current_date = Some(date_label);
        }

        lines.push(format!("  {}", event.render()));
    }

    lines
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d, %Y").to_string(),
    }
}
