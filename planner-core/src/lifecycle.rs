//! Moving elapsed events from the upcoming store into the archive.

use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::PlannerResult;
use crate::event::Event;
use crate::storage::Transaction;
use crate::store::EventStore;

/// Events split by whether they have elapsed. Input order is kept in both halves.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    pub upcoming: Vec<Event>,
    pub past: Vec<Event>,
}

/// Split `events` at `now`. An event scheduled exactly at `now` is past.
pub fn partition(events: Vec<Event>, now: NaiveDateTime) -> Partition {
    let (past, upcoming): (Vec<Event>, Vec<Event>) =
        events.into_iter().partition(|event| event.is_past(now));
    Partition { upcoming, past }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Events moved into the archive by this sweep.
    pub archived: usize,
    /// Events left in the upcoming store.
    pub remaining: usize,
}

/// Archive every event in `upcoming` that has elapsed at `now`.
///
/// The archive append and the upcoming rewrite commit together. When nothing
/// has elapsed no file is touched, so repeated sweeps are harmless. Callers
/// must hold the planner's writer lock.
pub fn sweep(
    data_dir: &Path,
    upcoming: &EventStore,
    archive: &EventStore,
    now: NaiveDateTime,
) -> PlannerResult<SweepReport> {
    let Partition { upcoming: future, past } = partition(upcoming.load_all()?, now);

    let report = SweepReport {
        archived: past.len(),
        remaining: future.len(),
    };
    if past.is_empty() {
        return Ok(report);
    }

    let mut tx = Transaction::new(data_dir);
    archive.stage_append(&mut tx, &past)?;
    upcoming.stage_replace(&mut tx, &future)?;
    tx.commit()?;

    tracing::info!(
        archived = report.archived,
        remaining = report.remaining,
        now = %now,
        "archived past events"
    );
    Ok(report)
}
