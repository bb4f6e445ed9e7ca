use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{MemoEntry, RoutineTrack, TimeRange, TodoItem, WeekSchedule};
use crate::mutate::update_routine_status;
use crate::routines::{self, MoveTaskError};
use crate::slots::{Reconciliation, apply_time_ranges, reconcile_slots, reset_slots};
use crate::storage::{
    KeyValueStore, LoadStatus, MEMOS_KEY, StorageError, TODOS_KEY, load_schedule, load_value,
    save_schedule, save_value,
};
use crate::transfer::{self, ExportPart, ImportError};
use crate::validate::{RangeOverlap, SettingsError};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    MoveTask(#[from] MoveTaskError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    Slots,
    Routines,
    All,
}

impl FromStr for ResetScope {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slots" => Ok(ResetScope::Slots),
            "routines" => Ok(ResetScope::Routines),
            "all" => Ok(ResetScope::All),
            other => Err(format!("unknown reset scope: {other} (expected slots, routines or all)")),
        }
    }
}

/// Owns the loaded document, todos and memos. Every change is written to the
/// store before it replaces the in-memory value.
pub struct Planner<S: KeyValueStore> {
    store: S,
    schedule: WeekSchedule,
    todos: Vec<TodoItem>,
    memos: Vec<MemoEntry>,
    default_ranges: Vec<TimeRange>,
    load_status: LoadStatus,
}

impl<S: KeyValueStore> Planner<S> {
    /// Loads every key, falling back to defaults, and makes sure the slot
    /// grid is complete before anything reads it.
    pub fn open(mut store: S, default_ranges: Vec<TimeRange>, now: DateTime<Utc>) -> Self {
        let loaded = load_schedule(&mut store, || {
            WeekSchedule::new(default_ranges.clone(), now)
        });
        let (schedule, reconciliation) = reconcile_slots(loaded.value, now);
        let readable = !matches!(loaded.status, LoadStatus::Unavailable { .. });
        if reconciliation != Reconciliation::Untouched && readable {
            match save_schedule(&mut store, &schedule) {
                Ok(()) => info!(?reconciliation, slots = schedule.slots.len(), "slot grid saved"),
                Err(err) => warn!(error = %err, "failed to save reconciled slot grid"),
            }
        }

        let todos = load_value(&mut store, TODOS_KEY, Vec::new).value;
        let memos = load_value(&mut store, MEMOS_KEY, Vec::new).value;

        Self {
            store,
            schedule,
            todos,
            memos,
            default_ranges,
            load_status: loaded.status,
        }
    }

    pub fn schedule(&self) -> &WeekSchedule {
        &self.schedule
    }

    pub fn todos(&self) -> &[TodoItem] {
        &self.todos
    }

    pub fn memos(&self) -> &[MemoEntry] {
        &self.memos
    }

    /// How the schedule was obtained when the planner opened.
    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn commit(&mut self, next: WeekSchedule) -> Result<(), PlannerError> {
        save_schedule(&mut self.store, &next)?;
        self.schedule = next;
        Ok(())
    }

    pub fn commit_todos(&mut self, next: Vec<TodoItem>) -> Result<(), PlannerError> {
        save_value(&mut self.store, TODOS_KEY, &next)?;
        self.todos = next;
        Ok(())
    }

    pub fn commit_memos(&mut self, next: Vec<MemoEntry>) -> Result<(), PlannerError> {
        save_value(&mut self.store, MEMOS_KEY, &next)?;
        self.memos = next;
        Ok(())
    }

    /// Checks a routine in for `date`. Returns false when nothing changed.
    pub fn check_in(
        &mut self,
        track: RoutineTrack,
        routine_id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool, PlannerError> {
        let Some(routine) = self.schedule.routine(track, routine_id) else {
            return Ok(false);
        };
        let Some(update) = routines::check_in(routine, date, now) else {
            return Ok(false);
        };

        let next = update_routine_status(&self.schedule, track, routine_id, date, &update, now);
        self.commit(next)?;
        Ok(true)
    }

    pub fn set_routine_note(
        &mut self,
        track: RoutineTrack,
        routine_id: &str,
        date: NaiveDate,
        note: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, PlannerError> {
        let Some(routine) = self.schedule.routine(track, routine_id) else {
            return Ok(false);
        };
        let update = routines::set_note(routine, date, note);

        let next = update_routine_status(&self.schedule, track, routine_id, date, &update, now);
        self.commit(next)?;
        Ok(true)
    }

    /// Moves a checklist item to the top of the todo list. Both keys change
    /// or neither does.
    pub fn move_task_to_memo(
        &mut self,
        slot_id: u32,
        item_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TodoItem, PlannerError> {
        let (todo, slots) = routines::move_task_to_memo(
            slot_id,
            item_id,
            &self.schedule.slots,
            &self.todos,
            now,
        )?;
        let next_schedule = WeekSchedule {
            slots,
            last_updated: now,
            ..self.schedule.clone()
        };
        let mut next_todos = Vec::with_capacity(self.todos.len() + 1);
        next_todos.push(todo.clone());
        next_todos.extend_from_slice(&self.todos);

        save_schedule(&mut self.store, &next_schedule)?;
        if let Err(err) = save_value(&mut self.store, TODOS_KEY, &next_todos) {
            warn!(error = %err, slot_id, item_id, "todo write failed, restoring schedule");
            if let Err(restore) = save_schedule(&mut self.store, &self.schedule) {
                error!(error = %restore, "failed to restore schedule after partial move");
            }
            return Err(err.into());
        }

        self.schedule = next_schedule;
        self.todos = next_todos;
        info!(slot_id, item_id, "moved task to memo pad");
        Ok(todo)
    }

    pub fn apply_time_ranges(
        &mut self,
        ranges: Vec<TimeRange>,
        now: DateTime<Utc>,
    ) -> Result<Vec<RangeOverlap>, PlannerError> {
        let (next, overlaps) = apply_time_ranges(&self.schedule, ranges, now)?;
        self.commit(next)?;
        Ok(overlaps)
    }

    pub fn import(&mut self, part: ExportPart, text: &str, now: DateTime<Utc>) -> Result<(), PlannerError> {
        let next = transfer::import(&self.schedule, part, text, now)?;
        self.commit(next)?;
        info!(?part, "import applied");
        Ok(())
    }

    pub fn reset(&mut self, scope: ResetScope, now: DateTime<Utc>) -> Result<(), PlannerError> {
        let next = match scope {
            ResetScope::Slots => reset_slots(&self.schedule, self.default_ranges.clone(), now),
            ResetScope::Routines => WeekSchedule {
                morning_routines: Vec::new(),
                evening_routines: Vec::new(),
                last_updated: now,
                ..self.schedule.clone()
            },
            ResetScope::All => reconcile_slots(WeekSchedule::new(self.default_ranges.clone(), now), now).0,
        };
        self.commit(next)?;
        info!(?scope, "reset applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use crate::domain::{ChecklistItem, RoutineTrack, TimeRange, WeekSchedule, default_time_ranges};
    use crate::mutate::{SlotPatch, add_routine, update_slot};
    use crate::storage::memory::MemoryStore;
    use crate::storage::{KeyValueStore, LoadStatus, SCHEDULE_KEY, TODOS_KEY};
    use crate::transfer::ExportPart;

    use super::{Planner, PlannerError, ResetScope};

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 5, 8, 0, 0).unwrap()
    }

    fn planner() -> Planner<MemoryStore> {
        Planner::open(MemoryStore::default(), default_time_ranges(), clock())
    }

    fn with_task(mut planner: Planner<MemoryStore>) -> Planner<MemoryStore> {
        let item = ChecklistItem {
            id: "task0001".to_string(),
            text: "Write minutes".to_string(),
            completed: false,
        };
        let next = update_slot(planner.schedule(), 1, &SlotPatch::checklist(vec![item]), clock());
        planner.commit(next).expect("commit works");
        planner
    }

    fn stored_schedule(store: &MemoryStore) -> WeekSchedule {
        let raw = store
            .read(SCHEDULE_KEY)
            .expect("memory reads work")
            .expect("schedule stored");
        serde_json::from_str(&raw).expect("stored schedule parses")
    }

    #[test]
    fn first_open_generates_and_persists_grid() {
        let planner = planner();
        assert_eq!(planner.schedule().slots.len(), 14);
        assert_eq!(planner.load_status(), &LoadStatus::Missing);
        assert_eq!(stored_schedule(&planner.store), *planner.schedule());
        assert!(planner.todos().is_empty());
    }

    #[test]
    fn unreadable_store_is_never_overwritten_on_open() {
        let mut store = MemoryStore {
            unreadable: true,
            ..MemoryStore::default()
        };
        store
            .values
            .insert(SCHEDULE_KEY.to_string(), "{\"kept\": true}".to_string());

        let planner = Planner::open(store, default_time_ranges(), clock());
        assert!(matches!(planner.load_status(), LoadStatus::Unavailable { .. }));
        assert_eq!(planner.schedule().slots.len(), 14);
        assert_eq!(planner.store.writes, 0);
        assert_eq!(
            planner.store.values.get(SCHEDULE_KEY).map(String::as_str),
            Some("{\"kept\": true}")
        );
    }

    #[test]
    fn reopen_reads_back_committed_state() {
        let mut planner = planner();
        let next = add_routine(planner.schedule(), RoutineTrack::Morning, "Stretch", clock());
        planner.commit(next).expect("commit works");

        let reopened = Planner::open(planner.store, Vec::new(), clock() + Duration::hours(1));
        assert_eq!(reopened.load_status(), &LoadStatus::Stored);
        assert_eq!(reopened.schedule().morning_routines[0].text, "Stretch");
        assert_eq!(reopened.schedule().time_ranges(), default_time_ranges().as_slice());
    }

    #[test]
    fn check_in_is_recorded_once() {
        let mut planner = planner();
        let next = add_routine(planner.schedule(), RoutineTrack::Evening, "Read", clock());
        planner.commit(next).expect("commit works");
        let id = planner.schedule().evening_routines[0].id.clone();
        let date = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();

        assert!(planner.check_in(RoutineTrack::Evening, &id, date, clock()).expect("check-in works"));
        let later = clock() + Duration::hours(3);
        assert!(!planner.check_in(RoutineTrack::Evening, &id, date, later).expect("check-in works"));
        assert!(
            planner
                .set_routine_note(RoutineTrack::Evening, &id, date, "two chapters", later)
                .expect("note works")
        );

        let status = planner.schedule().evening_routines[0]
            .status(date)
            .expect("date tracked")
            .clone();
        assert!(status.completed);
        assert_eq!(status.completed_at, Some(clock()));
        assert_eq!(status.note.as_deref(), Some("two chapters"));
        assert!(!planner.check_in(RoutineTrack::Evening, "missing", date, later).expect("no-op"));
    }

    #[test]
    fn move_task_writes_both_keys() {
        let mut planner = with_task(planner());
        let todo = planner
            .move_task_to_memo(1, "task0001", clock())
            .expect("move works");

        assert!(todo.text.ends_with(": Write minutes"));
        assert_eq!(planner.todos(), std::slice::from_ref(&todo));
        assert!(planner.schedule().slots[1].checklist.is_empty());
        assert!(stored_schedule(&planner.store).slots[1].checklist.is_empty());
        assert!(planner.store.values.contains_key(TODOS_KEY));
    }

    #[test]
    fn failed_todo_write_restores_schedule() {
        let mut planner = with_task(planner());
        let before = planner.schedule().clone();
        planner.store.failing.push(TODOS_KEY.to_string());

        let result = planner.move_task_to_memo(1, "task0001", clock() + Duration::minutes(1));
        assert!(matches!(result, Err(PlannerError::Storage(_))));
        assert_eq!(planner.schedule(), &before);
        assert!(planner.todos().is_empty());
        assert_eq!(stored_schedule(&planner.store), before);
        assert!(!planner.store.values.contains_key(TODOS_KEY));
    }

    #[test]
    fn moving_unknown_task_is_an_error() {
        let mut planner = planner();
        let writes = planner.store.writes;
        let result = planner.move_task_to_memo(0, "nope", clock());
        assert!(matches!(result, Err(PlannerError::MoveTask(_))));
        assert_eq!(planner.store.writes, writes);
    }

    #[test]
    fn rejected_import_leaves_state_alone() {
        let mut planner = with_task(planner());
        let before = stored_schedule(&planner.store);
        let text = serde_json::json!({ "slots": before.slots }).to_string();

        let result = planner.import(ExportPart::Slots, &text, clock());
        assert!(matches!(result, Err(PlannerError::Import(_))));
        assert_eq!(stored_schedule(&planner.store), before);
        assert_eq!(planner.schedule(), &before);
    }

    #[test]
    fn rejected_ranges_leave_state_alone() {
        let mut planner = planner();
        let before = planner.schedule().clone();
        let result = planner.apply_time_ranges(vec![TimeRange::new("", "08:00", "09:00")], clock());
        assert!(matches!(result, Err(PlannerError::Settings(_))));
        assert_eq!(planner.schedule(), &before);
    }

    #[test]
    fn reset_scopes() {
        let mut planner = with_task(planner());
        let next = add_routine(planner.schedule(), RoutineTrack::Morning, "Run", clock());
        planner.commit(next).expect("commit works");
        planner
            .apply_time_ranges(vec![TimeRange::new("종일", "09:00", "18:00")], clock())
            .expect("ranges apply");

        planner.reset(ResetScope::Routines, clock()).expect("reset works");
        assert!(planner.schedule().morning_routines.is_empty());
        assert_eq!(planner.schedule().slots.len(), 7);

        planner.reset(ResetScope::Slots, clock()).expect("reset works");
        assert_eq!(planner.schedule().slots.len(), 14);
        assert!(planner.schedule().slots.iter().all(|slot| !slot.has_content()));

        planner.reset(ResetScope::All, clock()).expect("reset works");
        assert!(planner.schedule().is_dense());
        assert_eq!(stored_schedule(&planner.store), *planner.schedule());
        assert_eq!("ALL".parse::<ResetScope>(), Ok(ResetScope::All));
    }
}
