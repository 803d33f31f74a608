use anyhow::Result;
use owo_colors::OwoColorize;
use planner_core::{Event, EventIdentity, Planner, PlannerError};

use super::parse_at;
use crate::render;

/// Which stored event to change.
pub struct Selection {
    pub class: String,
    pub name: String,
    pub date: String,
}

/// Fields to replace; `None` keeps the current value.
pub struct Changes {
    pub class: Option<String>,
    pub name: Option<String>,
    pub at: Option<String>,
    pub description: Option<String>,
}

pub fn add(
    planner: &Planner,
    class: String,
    name: String,
    at: &str,
    description: String,
) -> Result<()> {
    require_class(planner, &class)?;
    let event = Event::new(class, name, parse_at(at)?, description);
    let past = event.is_past(planner.now());

    planner.save_event(event.clone())?;

    if past {
        println!(
            "{}",
            format!("  Added {} (already past, moved to the archive)", event).yellow()
        );
    } else {
        println!("{}", format!("  Added {}", event).green());
    }
    Ok(())
}

pub fn update(planner: &Planner, selection: Selection, changes: Changes) -> Result<()> {
    let identity = EventIdentity::new(selection.class, selection.name, selection.date);

    let Some(current) =
        planner.event_by_details(&identity.class_name, &identity.event_name, &identity.date)?
    else {
        return Err(PlannerError::EventNotFound(identity.to_string()).into());
    };

    if let Some(class) = &changes.class {
        require_class(planner, class)?;
    }
    let date_time = match changes.at {
        Some(at) => parse_at(&at)?,
        None => current.date_time,
    };
    let updated = Event::new(
        changes.class.unwrap_or(current.class_name),
        changes.name.unwrap_or(current.event_name),
        date_time,
        changes.description.unwrap_or(current.description),
    );

    planner.update_event(&identity, updated.clone())?;
    println!("{}", format!("  Updated {}", updated).yellow());
    Ok(())
}

pub fn delete(planner: &Planner, class: &str, name: &str) -> Result<()> {
    let removed = planner.delete_event(name, class)?;
    let noun = if removed == 1 { "event" } else { "events" };
    println!(
        "{}",
        format!("  Deleted {} {} named {} in {}", removed, noun, name, class).red()
    );
    Ok(())
}

pub fn upcoming(planner: &Planner, class: Option<&str>, json: bool) -> Result<()> {
    let mut events = planner.upcoming_events()?;
    if let Some(class) = class {
        events.retain(|event| event.belongs_to(class));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("{}", "No upcoming events".dimmed());
        return Ok(());
    }

    for line in render::render_by_day(&events) {
        println!("{}", line);
    }
    Ok(())
}

pub fn show(planner: &Planner, class: &str, name: &str, date: &str) -> Result<()> {
    match planner.event_by_details(class, name, date)? {
        Some(event) => {
            for line in render::render_detail(&event) {
                println!("{}", line);
            }
            if event.is_past(planner.now()) {
                println!("  {}", "(past)".dimmed());
            }
            Ok(())
        }
        None => Err(PlannerError::EventNotFound(format!("{} / {} / {}", class, name, date)).into()),
    }
}

fn require_class(planner: &Planner, class: &str) -> Result<()> {
    if planner.class_exists(class)? {
        Ok(())
    } else {
        Err(PlannerError::ClassNotFound(class.to_string()).into())
    }
}
