mod commands;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use planner_core::{Planner, PlannerConfig, PlannerError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Keep track of class events; past events are archived automatically")]
struct Cli {
    /// Use this data directory instead of the configured one
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List classes
    Classes,
    /// Add, rename or delete a class
    Class {
        #[command(subcommand)]
        action: ClassAction,
    },
    /// Add an event
    Add {
        class: String,
        name: String,

        /// When, as "YYYY-MM-DD HH:MM"
        #[arg(short, long)]
        at: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Change an event, selected by class, name and date (e.g. "March 19, 2025")
    Update {
        class: String,
        name: String,
        date: String,

        #[arg(long)]
        new_class: Option<String>,

        #[arg(long)]
        new_name: Option<String>,

        /// New time, as "YYYY-MM-DD HH:MM"
        #[arg(long)]
        at: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete every upcoming event with this name in this class
    Delete { class: String, name: String },
    /// Show upcoming events, soonest first
    Upcoming {
        /// Only events of this class
        #[arg(short, long)]
        class: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Show archived past events
    Past {
        #[arg(long)]
        json: bool,
    },
    /// Empty the past-events archive
    ClearPast,
    /// Show one event in full
    Show {
        class: String,
        name: String,
        date: String,
    },
    /// Move elapsed events into the archive now
    Sweep,
    /// Bring an archived event back with a new time
    Reschedule {
        class: String,
        name: String,

        /// New time, as "YYYY-MM-DD HH:MM"
        #[arg(short, long)]
        at: String,

        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum ClassAction {
    Add { name: String },
    Rename { old: String, new: String },
    Delete { name: String },
}

fn main() -> ExitCode {
    // Diagnostics go to stderr so command output stays clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<PlannerError>() {
                Some(planner_err) => {
                    tracing::debug!(error = %planner_err, "command failed");
                    eprintln!("Error: {}", planner_err.user_message());
                }
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match cli.data_dir {
        Some(dir) => PlannerConfig::with_data_dir(dir),
        None => PlannerConfig::load()?,
    };
    let planner = Planner::open(&config)?;

    match cli.command {
        Commands::Classes => commands::classes::list(&planner),
        Commands::Class { action } => match action {
            ClassAction::Add { name } => commands::classes::add(&planner, &name),
            ClassAction::Rename { old, new } => commands::classes::rename(&planner, &old, &new),
            ClassAction::Delete { name } => commands::classes::delete(&planner, &name),
        },
        Commands::Add {
            class,
            name,
            at,
            description,
        } => commands::events::add(&planner, class, name, &at, description),
        Commands::Update {
            class,
            name,
            date,
            new_class,
            new_name,
            at,
            description,
        } => commands::events::update(
            &planner,
            commands::events::Selection {
                class,
                name,
                date,
            },
            commands::events::Changes {
                class: new_class,
                name: new_name,
                at,
                description,
            },
        ),
        Commands::Delete { class, name } => commands::events::delete(&planner, &class, &name),
        Commands::Upcoming { class, json } => {
            commands::events::upcoming(&planner, class.as_deref(), json)
        }
        Commands::Show { class, name, date } => {
            commands::events::show(&planner, &class, &name, &date)
        }
        Commands::Past { json } => commands::archive::list(&planner, json),
        Commands::ClearPast => commands::archive::clear(&planner),
        Commands::Sweep => commands::archive::sweep(&planner),
        Commands::Reschedule {
            class,
            name,
            at,
            description,
        } => commands::archive::reschedule(&planner, &class, &name, &at, description),
    }
}
