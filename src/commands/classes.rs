use anyhow::Result;
use owo_colors::OwoColorize;
use planner_core::Planner;

pub fn list(planner: &Planner) -> Result<()> {
    let classes = planner.classes()?;

    if classes.is_empty() {
        println!("{}", "No classes yet".dimmed());
        return Ok(());
    }

    for class in classes {
        let count = planner.load_events_for_class(&class)?.len();
        println!("  {} {}", class.bold(), format!("({} upcoming)", count).dimmed());
    }

    Ok(())
}

pub fn add(planner: &Planner, name: &str) -> Result<()> {
    if planner.add_class(name)? {
        println!("{}", format!("  Added class: {}", name).green());
    } else {
        println!("{}", format!("  Class already exists: {}", name).dimmed());
    }
    Ok(())
}

pub fn rename(planner: &Planner, old: &str, new: &str) -> Result<()> {
    let rekeyed = planner.rename_class(old, new)?;
    println!(
        "{}",
        format!("  Renamed {} → {} ({} events moved)", old, new, rekeyed).green()
    );
    Ok(())
}

pub fn delete(planner: &Planner, name: &str) -> Result<()> {
    let removed = planner.delete_class(name)?;
    println!(
        "{}",
        format!("  Deleted class {} and {} events", name, removed).red()
    );
    Ok(())
}
