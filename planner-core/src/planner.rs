//! The planner context: every operation a presentation layer calls.
//!
//! One `Planner` owns the three store files of a data directory. Mutations
//! are serialized through a single writer lock and multi-file changes commit
//! as one [`Transaction`]. Listeners are notified after the lock is released,
//! so a callback can immediately read fresh views from the same planner.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime};
use tokio::sync::broadcast;

use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};
use crate::event::{Event, EventIdentity};
use crate::lifecycle::{self, SweepReport};
use crate::notify::{Change, ChangeNotifier};
use crate::registry::{self, ClassRegistry};
use crate::storage::{self, Transaction};
use crate::store::{self, EventStore};

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

fn system_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub struct Planner {
    data_dir: PathBuf,
    upcoming: EventStore,
    archive: EventStore,
    registry: ClassRegistry,
    write_lock: Mutex<()>,
    notifier: ChangeNotifier,
    clock: Clock,
}

impl Planner {
    /// Open the stores described by `config`, creating missing files and
    /// finishing any write that was interrupted by a crash. Store file names
    /// must be plain names inside the data directory.
    pub fn open(config: &PlannerConfig) -> PlannerResult<Self> {
        config.validate()?;
        let data_dir = config.data_path();
        std::fs::create_dir_all(&data_dir)?;
        storage::recover(&data_dir)?;

        let planner = Planner {
            upcoming: EventStore::new(config.events_path()),
            archive: EventStore::new(config.past_events_path()),
            registry: ClassRegistry::new(config.classes_path()),
            data_dir,
            write_lock: Mutex::new(()),
            notifier: ChangeNotifier::new(),
            clock: Arc::new(system_now),
        };

        storage::ensure_file(planner.upcoming.path())?;
        storage::ensure_file(planner.archive.path())?;
        storage::ensure_file(planner.registry.path())?;

        tracing::debug!(data_dir = %planner.data_dir.display(), "planner opened");
        Ok(planner)
    }

    /// Open with default file names inside `data_dir`.
    pub fn open_in(data_dir: impl Into<PathBuf>) -> PlannerResult<Self> {
        Self::open(&PlannerConfig::with_data_dir(data_dir))
    }

    /// Replace the wall clock used to decide what is past.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    // NOTIFICATIONS:

    /// Register a callback run after every completed mutation.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.on_change(callback);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.notifier.subscribe()
    }

    // EVENT OPERATIONS:

    /// Store a new event, then sweep elapsed events into the archive.
    pub fn save_event(&self, event: Event) -> PlannerResult<()> {
        let event = event.at_minute_precision();
        let outcome = {
            let _guard = self.lock();
            self.upcoming.append(&event)?;
            self.sweep_locked()
        };
        self.finish_event_change(outcome)
    }

    /// Replace the event identified by `old` with `new_event`.
    pub fn update_event(&self, old: &EventIdentity, new_event: Event) -> PlannerResult<()> {
        let outcome = {
            let _guard = self.lock();
            self.upcoming.update(old, new_event.at_minute_precision())?;
            self.sweep_locked()
        };
        self.finish_event_change(outcome)
    }

    /// Delete every upcoming event with this name in this class.
    /// Returns how many were removed.
    pub fn delete_event(&self, event_name: &str, class_name: &str) -> PlannerResult<usize> {
        let (removed, outcome) = {
            let _guard = self.lock();
            let removed = self.upcoming.delete(event_name, class_name)?;
            (removed, self.sweep_locked())
        };
        self.finish_event_change(outcome)?;
        Ok(removed)
    }

    /// Look up one event by its composite identity, upcoming first, then archive.
    pub fn event_by_details(
        &self,
        class_name: &str,
        event_name: &str,
        date: &str,
    ) -> PlannerResult<Option<Event>> {
        let _guard = self.lock();
        match self.upcoming.find_by_identity(class_name, event_name, date)? {
            Some(event) => Ok(Some(event)),
            None => self.archive.find_by_identity(class_name, event_name, date),
        }
    }

    /// Upcoming events of one class, in store order.
    pub fn load_events_for_class(&self, class_name: &str) -> PlannerResult<Vec<Event>> {
        let _guard = self.lock();
        Ok(self
            .upcoming
            .load_all()?
            .into_iter()
            .filter(|event| event.belongs_to(class_name))
            .collect())
    }

    /// Events still in the future, soonest first. Ties keep store order.
    pub fn upcoming_events(&self) -> PlannerResult<Vec<Event>> {
        let now = self.now();
        let _guard = self.lock();

        let mut events: Vec<Event> = self
            .upcoming
            .load_all()?
            .into_iter()
            .filter(|event| !event.is_past(now))
            .collect();
        events.sort_by_key(|event| event.date_time);
        Ok(events)
    }

    pub fn event_names(&self) -> PlannerResult<Vec<String>> {
        let _guard = self.lock();
        Ok(self
            .upcoming
            .load_all()?
            .into_iter()
            .map(|event| event.event_name)
            .collect())
    }

    // ARCHIVE OPERATIONS:

    pub fn past_events(&self) -> PlannerResult<Vec<Event>> {
        let _guard = self.lock();
        self.archive.load_all()
    }

    pub fn clear_past_events(&self) -> PlannerResult<()> {
        {
            let _guard = self.lock();
            self.archive.clear()?;
        }
        self.notifier.notify(Change::Archive);
        Ok(())
    }

    /// Move archived events named `event_name` in `class_name` back to the
    /// upcoming store as `new_event`. Returns how many archived copies were
    /// removed.
    pub fn reschedule_past_event(
        &self,
        class_name: &str,
        event_name: &str,
        new_event: Event,
    ) -> PlannerResult<usize> {
        let new_event = new_event.at_minute_precision();
        let (removed, outcome) = {
            let _guard = self.lock();

            let (removed, kept) =
                store::split_matching(self.archive.load_all()?, event_name, class_name);
            if removed.is_empty() {
                return Err(PlannerError::EventNotFound(format!(
                    "{} / {}",
                    class_name, event_name
                )));
            }

            let mut tx = Transaction::new(&self.data_dir);
            self.archive.stage_replace(&mut tx, &kept)?;
            self.upcoming
                .stage_append(&mut tx, std::slice::from_ref(&new_event))?;
            tx.commit()?;

            (removed.len(), self.sweep_locked())
        };

        self.notifier.notify(Change::Archive);
        self.finish_event_change(outcome)?;
        Ok(removed)
    }

    /// Archive everything that has elapsed according to the planner clock.
    pub fn sweep(&self) -> PlannerResult<SweepReport> {
        self.sweep_at(self.now())
    }

    /// Archive everything scheduled at or before `now`.
    pub fn sweep_at(&self, now: NaiveDateTime) -> PlannerResult<SweepReport> {
        let report = {
            let _guard = self.lock();
            lifecycle::sweep(&self.data_dir, &self.upcoming, &self.archive, now)?
        };
        if report.archived > 0 {
            self.notifier.notify(Change::Events);
            self.notifier.notify(Change::Archive);
        }
        Ok(report)
    }

    // CLASS OPERATIONS:

    pub fn classes(&self) -> PlannerResult<Vec<String>> {
        let _guard = self.lock();
        self.registry.load_all()
    }

    /// Exact, case-sensitive membership check.
    pub fn class_exists(&self, class_name: &str) -> PlannerResult<bool> {
        let _guard = self.lock();
        self.registry.exists(class_name)
    }

    /// Register a class. Returns `false` if it was already registered.
    pub fn add_class(&self, class_name: &str) -> PlannerResult<bool> {
        let added = {
            let _guard = self.lock();
            self.registry.add(class_name)?
        };
        if added {
            self.notifier.notify(Change::Classes);
        }
        Ok(added)
    }

    /// Rename a class and re-key its events in both stores, all in one
    /// transaction. Returns how many events were re-keyed.
    pub fn rename_class(&self, old_name: &str, new_name: &str) -> PlannerResult<usize> {
        let rekeyed = {
            let _guard = self.lock();

            let classes = registry::renamed(&self.registry.load_all()?, old_name, new_name)?;
            let mut upcoming = self.upcoming.load_all()?;
            let mut past = self.archive.load_all()?;
            let upcoming_changed = rekey(&mut upcoming, old_name, new_name);
            let past_changed = rekey(&mut past, old_name, new_name);

            let mut tx = Transaction::new(&self.data_dir);
            self.registry.stage_replace(&mut tx, &classes)?;
            if upcoming_changed > 0 {
                self.upcoming.stage_replace(&mut tx, &upcoming)?;
            }
            if past_changed > 0 {
                self.archive.stage_replace(&mut tx, &past)?;
            }
            tx.commit()?;

            tracing::info!(
                from = old_name,
                to = new_name,
                events = upcoming_changed + past_changed,
                "renamed class"
            );
            upcoming_changed + past_changed
        };

        self.notifier.notify(Change::Classes);
        Ok(rekeyed)
    }

    /// Remove a class and every event in it from both stores, in one
    /// transaction. Returns how many events were removed. Unknown classes
    /// are not an error; orphaned events carrying the name are still removed.
    pub fn delete_class(&self, class_name: &str) -> PlannerResult<usize> {
        let removed = {
            let _guard = self.lock();

            let (classes, entry_removed) =
                registry::without(self.registry.load_all()?, class_name);
            let (upcoming_gone, upcoming): (Vec<Event>, Vec<Event>) = self
                .upcoming
                .load_all()?
                .into_iter()
                .partition(|event| event.belongs_to(class_name));
            let (past_gone, past): (Vec<Event>, Vec<Event>) = self
                .archive
                .load_all()?
                .into_iter()
                .partition(|event| event.belongs_to(class_name));

            let removed = upcoming_gone.len() + past_gone.len();
            if !entry_removed && removed == 0 {
                return Ok(0);
            }

            let mut tx = Transaction::new(&self.data_dir);
            if entry_removed {
                self.registry.stage_replace(&mut tx, &classes)?;
            }
            if !upcoming_gone.is_empty() {
                self.upcoming.stage_replace(&mut tx, &upcoming)?;
            }
            if !past_gone.is_empty() {
                self.archive.stage_replace(&mut tx, &past)?;
            }
            tx.commit()?;

            tracing::info!(class = class_name, events = removed, "deleted class");
            removed
        };

        self.notifier.notify(Change::Classes);
        Ok(removed)
    }

    // INTERNALS:

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sweep_locked(&self) -> PlannerResult<SweepReport> {
        lifecycle::sweep(&self.data_dir, &self.upcoming, &self.archive, self.now())
    }

    /// Notify after an upcoming-store mutation whose follow-up sweep produced
    /// `outcome`. The mutation itself already landed, so listeners hear about
    /// it even if the sweep failed.
    fn finish_event_change(&self, outcome: PlannerResult<SweepReport>) -> PlannerResult<()> {
        self.notifier.notify(Change::Events);
        let report = outcome?;
        if report.archived > 0 {
            self.notifier.notify(Change::Archive);
        }
        Ok(())
    }
}

/// Point every event of class `from` at class `to`. Returns how many changed.
fn rekey(events: &mut [Event], from: &str, to: &str) -> usize {
    let mut changed = 0;
    for event in events.iter_mut().filter(|event| event.belongs_to(from)) {
        event.class_name = to.to_string();
        changed += 1;
    }
    changed
}
