//! Durable list of events, one record per line.
//!
//! The same type backs both the upcoming store and the past-events archive.

use std::path::{Path, PathBuf};

use crate::error::{PlannerError, PlannerResult};
use crate::event::{self, Event, EventIdentity};
use crate::storage::{self, Transaction};

/// A line that could not be decoded during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based line number in the store file.
    pub line_number: usize,
    pub record: String,
    pub reason: String,
}

/// Everything a load produced, including the lines it had to skip.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub events: Vec<Event>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EventStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode every non-blank line. Malformed lines are logged and reported,
    /// never fatal.
    pub fn load_report(&self) -> PlannerResult<LoadReport> {
        let mut report = LoadReport::default();

        for (idx, raw) in storage::read_raw_lines(&self.path)?.into_iter().enumerate() {
            let decoded = match String::from_utf8(raw) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => event::decode(&line),
                Err(e) => Err(PlannerError::malformed(
                    &String::from_utf8_lossy(e.as_bytes()),
                    "not valid UTF-8",
                )),
            };
            match decoded {
                Ok(event) => report.events.push(event),
                Err(PlannerError::MalformedRecord { record, reason }) => {
                    tracing::warn!(
                        file = %self.path.display(),
                        line = idx + 1,
                        %reason,
                        "skipping malformed event record"
                    );
                    report.skipped.push(SkippedRecord {
                        line_number: idx + 1,
                        record,
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    pub fn load_all(&self) -> PlannerResult<Vec<Event>> {
        Ok(self.load_report()?.events)
    }

    pub fn append(&self, event: &Event) -> PlannerResult<()> {
        storage::append_lines(&self.path, [event::encode(event)])?;
        tracing::debug!(file = %self.path.display(), event = %event, "appended event");
        Ok(())
    }

    /// Overwrite the whole store atomically.
    ///
    /// Lines skipped by the preceding load are not carried over.
    pub fn replace_all(&self, events: &[Event]) -> PlannerResult<()> {
        storage::write_lines_atomic(&self.path, events.iter().map(event::encode))?;
        tracing::debug!(file = %self.path.display(), count = events.len(), "rewrote store");
        Ok(())
    }

    /// Stage a full rewrite as part of a larger transaction.
    pub fn stage_replace(&self, tx: &mut Transaction, events: &[Event]) -> PlannerResult<()> {
        tx.stage(&self.path, events.iter().map(event::encode))?;
        Ok(())
    }

    /// Stage `events` appended after the current file content, which is kept
    /// line for line, including lines that do not decode.
    pub fn stage_append(&self, tx: &mut Transaction, events: &[Event]) -> PlannerResult<()> {
        let mut lines = storage::read_raw_lines(&self.path)?;
        lines.extend(events.iter().map(|event| event::encode(event).into_bytes()));
        tx.stage(&self.path, &lines)?;
        Ok(())
    }

    pub fn clear(&self) -> PlannerResult<()> {
        self.replace_all(&[])
    }

    pub fn find_by_identity(
        &self,
        class_name: &str,
        event_name: &str,
        date: &str,
    ) -> PlannerResult<Option<Event>> {
        let identity = EventIdentity::new(class_name, event_name, date);
        Ok(self
            .load_all()?
            .into_iter()
            .find(|event| identity.matches(event)))
    }

    /// Replace the first event matching `old` with `new_event`.
    pub fn update(&self, old: &EventIdentity, new_event: Event) -> PlannerResult<()> {
        let mut events = self.load_all()?;

        let slot = events
            .iter_mut()
            .find(|event| old.matches(event))
            .ok_or_else(|| PlannerError::EventNotFound(old.to_string()))?;
        *slot = new_event;

        self.replace_all(&events)
    }

    /// Remove every event whose name and class both match. Returns how many
    /// were removed; zero matches is [`PlannerError::EventNotFound`].
    pub fn delete(&self, event_name: &str, class_name: &str) -> PlannerResult<usize> {
        let (removed, kept) = split_matching(self.load_all()?, event_name, class_name);

        if removed.is_empty() {
            return Err(PlannerError::EventNotFound(format!(
                "{} / {}",
                class_name, event_name
            )));
        }

        self.replace_all(&kept)?;
        Ok(removed.len())
    }
}

/// Split events into (matching, remaining) on event and class name.
pub(crate) fn split_matching(
    events: Vec<Event>,
    event_name: &str,
    class_name: &str,
) -> (Vec<Event>, Vec<Event>) {
    events.into_iter().partition(|event| {
        event.is_named(event_name) && event.belongs_to(class_name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn store_in(dir: &TempDir) -> EventStore {
        EventStore::new(dir.path().join("planner.txt"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load_all().unwrap().is_empty());
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let later = Event::new("Math", "Final", at(2030, 6, 1, 9), "");
        let sooner = Event::new("Math", "Quiz", at(2030, 2, 1, 9), "");

        store.append(&later).unwrap();
        store.append(&sooner).unwrap();

        assert_eq!(store.load_all().unwrap(), vec![later, sooner]);
    }

    #[test]
    fn test_load_report_skips_malformed_and_blank_lines() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            "Math|Quiz|2030-02-01 09:00|\n\nbroken line\nMath|Final|2030-06-01 09:00|bring pens\n",
        )
        .unwrap();

        let report = store.load_report().unwrap();

        assert_eq!(report.events.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line_number, 3);
        assert_eq!(report.skipped[0].record, "broken line");
    }

    #[test]
    fn test_load_report_skips_line_that_is_not_utf8() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            b"Math|Quiz|2030-02-01 09:00|\nArt|Bad|2030-02-01 09:00|caf\xe9\n",
        )
        .unwrap();

        let report = store.load_report().unwrap();

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line_number, 2);
        assert_eq!(report.skipped[0].reason, "not valid UTF-8");
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "Math|Quiz|2030-02-01 09:00|notes").unwrap();
        let show = Event::new("Art", "Show", at(2031, 1, 1, 9), "");

        store.append(&show).unwrap();

        let events = store.load_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].description, "notes");
        assert_eq!(events[1], show);
    }

    #[test]
    fn test_stage_append_keeps_undecodable_bytes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"caf\xe9\n").unwrap();
        let quiz = Event::new("Math", "Quiz", at(2030, 2, 1, 9), "");

        let mut tx = Transaction::new(dir.path());
        store.stage_append(&mut tx, std::slice::from_ref(&quiz)).unwrap();
        tx.commit().unwrap();

        let bytes = std::fs::read(store.path()).unwrap();
        assert!(bytes.starts_with(b"caf\xe9\n"));
        assert_eq!(store.load_all().unwrap(), vec![quiz]);
    }

    #[test]
    fn test_update_replaces_matching_event_only() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let quiz = Event::new("Math", "Quiz", at(2030, 2, 1, 9), "");
        let lab = Event::new("Chem", "Lab", at(2030, 2, 2, 9), "");
        store.replace_all(&[quiz.clone(), lab.clone()]).unwrap();

        let moved = Event::new("Math", "Quiz", at(2030, 2, 8, 9), "moved a week");
        store
            .update(&EventIdentity::new("MATH", "quiz", "February 1, 2030"), moved.clone())
            .unwrap();

        assert_eq!(store.load_all().unwrap(), vec![moved, lab]);
    }

    #[test]
    fn test_update_missing_identity_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let quiz = Event::new("Math", "Quiz", at(2030, 2, 1, 9), "");
        store.replace_all(std::slice::from_ref(&quiz)).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store
            .update(
                &EventIdentity::new("Math", "Quiz", "February 2, 2030"),
                Event::new("Math", "Quiz", at(2030, 3, 1, 9), ""),
            )
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_delete_removes_all_duplicates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .replace_all(&[
                Event::new("Math", "Quiz", at(2030, 2, 1, 9), ""),
                Event::new("Chem", "Quiz", at(2030, 2, 1, 9), ""),
                Event::new("math", "QUIZ", at(2030, 3, 1, 9), ""),
            ])
            .unwrap();

        assert_eq!(store.delete("quiz", "Math").unwrap(), 2);

        let left = store.load_all().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].class_name, "Chem");
    }

    #[test]
    fn test_delete_without_match_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let err = store.delete("Quiz", "Math").unwrap_err();
        assert!(matches!(err, PlannerError::EventNotFound(_)));
    }

    #[test]
    fn test_find_by_identity() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let quiz = Event::new("Math", "Quiz", at(2030, 2, 1, 9), "ch. 4");
        store.append(&quiz).unwrap();

        let found = store
            .find_by_identity("math", "quiz", "February 1, 2030")
            .unwrap();
        assert_eq!(found, Some(quiz));
        assert_eq!(
            store.find_by_identity("Math", "Quiz", "2030-02-01").unwrap(),
            None
        );
    }

    #[test]
    fn test_clear_truncates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .append(&Event::new("Math", "Quiz", at(2030, 2, 1, 9), ""))
            .unwrap();
        store.clear().unwrap();
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "");
    }
}
