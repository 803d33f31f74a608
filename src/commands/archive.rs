use anyhow::Result;
use owo_colors::OwoColorize;
use planner_core::{Event, Planner, PlannerError};

use super::parse_at;
use crate::render::Render;

pub fn list(planner: &Planner, json: bool) -> Result<()> {
    let mut events = planner.past_events()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No past events".dimmed());
        return Ok(());
    }

    // Most recent first
    events.sort_by(|a, b| b.date_time.cmp(&a.date_time));

    for event in &events {
        println!("  {} {}", event.date_formatted().dimmed(), event.render());
    }
    Ok(())
}

pub fn clear(planner: &Planner) -> Result<()> {
    let count = planner.past_events()?.len();
    planner.clear_past_events()?;
    println!("{}", format!("  Cleared {} past events", count).red());
    Ok(())
}

pub fn sweep(planner: &Planner) -> Result<()> {
    let report = planner.sweep()?;

    if report.archived == 0 {
        println!("{}", "Nothing to archive".dimmed());
    } else {
        println!(
            "{}",
            format!(
                "  Archived {} events, {} still upcoming",
                report.archived, report.remaining
            )
            .green()
        );
    }
    Ok(())
}

/// Bring an archived event back at a new time, keeping its description
/// unless a new one is given.
pub fn reschedule(
    planner: &Planner,
    class: &str,
    name: &str,
    at: &str,
    description: Option<String>,
) -> Result<()> {
    let date_time = parse_at(at)?;

    let archived = planner
        .past_events()?
        .into_iter()
        .rev()
        .find(|event| event.belongs_to(class) && event.is_named(name));
    let Some(archived) = archived else {
        return Err(PlannerError::EventNotFound(format!("{} / {}", class, name)).into());
    };

    let event = Event::new(
        archived.class_name,
        archived.event_name,
        date_time,
        description.unwrap_or(archived.description),
    );
    let still_past = event.is_past(planner.now());

    planner.reschedule_past_event(class, name, event.clone())?;

    if still_past {
        println!(
            "{}",
            format!("  Rescheduled {}, but it is already past", event).yellow()
        );
    } else {
        println!("{}", format!("  Rescheduled {}", event).green());
    }
    Ok(())
}
