use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::{ChecklistItem, DailyRoutine, Day, TimeSlot, TodoItem, unique_id};
use crate::mutate::StatusUpdate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveTaskError {
    #[error("slot {slot_id} does not exist")]
    SlotNotFound { slot_id: u32 },
    #[error("slot {slot_id} has no checklist item {item_id}")]
    ItemNotFound { slot_id: u32, item_id: String },
}

/// Marks `date` as done. Returns `None` when it already is, so the first
/// `completed_at` survives repeated check-ins.
pub fn check_in(routine: &DailyRoutine, date: NaiveDate, now: DateTime<Utc>) -> Option<StatusUpdate> {
    if routine.is_completed_on(date) {
        return None;
    }

    Some(StatusUpdate {
        completed: Some(true),
        completed_at: Some(now),
        note: None,
    })
}

/// Replaces the note for `date` and carries the completion state as it is.
pub fn set_note(routine: &DailyRoutine, date: NaiveDate, note: &str) -> StatusUpdate {
    let status = routine.status(date);
    StatusUpdate {
        completed: Some(status.is_some_and(|status| status.completed)),
        completed_at: status.and_then(|status| status.completed_at),
        note: Some(note.to_string()),
    }
}

/// An incomplete checklist item together with the slot it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfinishedTask<'a> {
    pub slot_id: u32,
    pub item: &'a ChecklistItem,
    pub origin: String,
}

/// Incomplete checklist items of every slot on `day`, in slot order.
pub fn unfinished_tasks(
    slots: &[TimeSlot],
    day: Day,
) -> impl Iterator<Item = UnfinishedTask<'_>> + Clone + '_ {
    slots
        .iter()
        .filter(move |slot| slot.day == day)
        .flat_map(|slot| {
            slot.checklist
                .iter()
                .filter(|item| !item.completed)
                .map(move |item| UnfinishedTask {
                    slot_id: slot.id,
                    item,
                    origin: slot.origin_label(),
                })
        })
}

/// Takes a checklist item out of its slot and turns it into a todo labelled
/// with where it came from.
pub fn move_task_to_memo(
    slot_id: u32,
    item_id: &str,
    slots: &[TimeSlot],
    todos: &[TodoItem],
    now: DateTime<Utc>,
) -> Result<(TodoItem, Vec<TimeSlot>), MoveTaskError> {
    let slot = slots
        .iter()
        .find(|slot| slot.id == slot_id)
        .ok_or(MoveTaskError::SlotNotFound { slot_id })?;
    let item = slot
        .checklist
        .iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| MoveTaskError::ItemNotFound {
            slot_id,
            item_id: item_id.to_string(),
        })?;

    let todo = TodoItem {
        id: unique_id(todos.iter().map(|todo| todo.id.as_str())),
        text: format!("{}: {}", slot.origin_label(), item.text),
        completed: false,
        created_at: now,
    };

    let updated = slots
        .iter()
        .map(|candidate| {
            if candidate.id != slot_id {
                return candidate.clone();
            }
            TimeSlot {
                checklist: candidate
                    .checklist
                    .iter()
                    .filter(|entry| entry.id != item_id)
                    .cloned()
                    .collect(),
                ..candidate.clone()
            }
        })
        .collect();

    Ok((todo, updated))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCell {
    pub date: NaiveDate,
    pub completed: bool,
}

/// Completion grid ending with the week that contains `today`.
/// `rows[weekday][week]`, Monday first; future dates are `None`.
pub fn routine_history(
    routine: &DailyRoutine,
    today: NaiveDate,
    weeks: usize,
) -> Vec<Vec<Option<HistoryCell>>> {
    let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let first = weeks
        .checked_sub(1)
        .and_then(|back| monday.checked_sub_days(Days::new(back as u64 * 7)));

    (0..7u64)
        .map(|weekday| {
            (0..weeks as u64)
                .map(|week| {
                    let date = first?.checked_add_days(Days::new(week * 7 + weekday))?;
                    (date <= today).then(|| HistoryCell {
                        date,
                        completed: routine.is_completed_on(date),
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::domain::{
        ChecklistItem, DailyRoutine, DailyRoutineStatus, Day, SlotCategory, TodoItem,
        default_time_ranges,
    };
    use crate::slots::generate_slots;

    use super::{MoveTaskError, check_in, move_task_to_memo, routine_history, set_note, unfinished_tasks};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
    }

    fn routine() -> DailyRoutine {
        DailyRoutine {
            id: "walk0001".to_string(),
            text: "Walk".to_string(),
            note: None,
            daily_status: Default::default(),
        }
    }

    fn item(id: &str, text: &str, completed: bool) -> ChecklistItem {
        ChecklistItem {
            id: id.to_string(),
            text: text.to_string(),
            completed,
        }
    }

    #[test]
    fn check_in_twice_keeps_first_timestamp() {
        let first_at = Utc.with_ymd_and_hms(2026, 6, 3, 7, 0, 0).unwrap();
        let mut routine = routine();
        let update = check_in(&routine, date(3), first_at).expect("first check-in updates");
        assert_eq!(update.completed, Some(true));
        assert_eq!(update.completed_at, Some(first_at));

        routine.daily_status.insert(
            date(3),
            DailyRoutineStatus {
                completed: true,
                completed_at: Some(first_at),
                note: None,
            },
        );
        assert!(check_in(&routine, date(3), first_at + Duration::hours(2)).is_none());
        assert!(check_in(&routine, date(4), first_at).is_some());
    }

    #[test]
    fn set_note_preserves_completion() {
        let at = Utc.with_ymd_and_hms(2026, 6, 3, 7, 0, 0).unwrap();
        let mut routine = routine();
        routine.daily_status.insert(
            date(3),
            DailyRoutineStatus {
                completed: true,
                completed_at: Some(at),
                note: Some("old".to_string()),
            },
        );

        let update = set_note(&routine, date(3), "rainy, short loop");
        assert_eq!(update.completed, Some(true));
        assert_eq!(update.completed_at, Some(at));
        assert_eq!(update.note.as_deref(), Some("rainy, short loop"));

        let fresh = set_note(&routine, date(9), "later");
        assert_eq!(fresh.completed, Some(false));
        assert_eq!(fresh.completed_at, None);
    }

    #[test]
    fn unfinished_tasks_walk_one_day_in_slot_order() {
        let mut slots = generate_slots(&[], &default_time_ranges());
        slots[0].title = "Pipeline".to_string();
        slots[0].checklist = vec![item("a", "Call Kim", false), item("b", "Done", true)];
        slots[1].category = SlotCategory::Strategy;
        slots[1].checklist = vec![item("c", "Roadmap", false)];
        slots[2].checklist = vec![item("d", "Tuesday only", false)];

        let tasks = unfinished_tasks(&slots, Day::Mon);
        let texts: Vec<_> = tasks.clone().map(|task| task.item.text.as_str()).collect();
        assert_eq!(texts, vec!["Call Kim", "Roadmap"]);

        let origins: Vec<_> = tasks.map(|task| task.origin).collect();
        assert_eq!(origins, vec!["[오전] Pipeline", "[오후] 전략/방향"]);
        assert_eq!(unfinished_tasks(&slots, Day::Sun).count(), 0);
    }

    #[test]
    fn moving_a_task_creates_prefixed_todo() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 18, 5, 0).unwrap();
        let mut slots = generate_slots(&[], &default_time_ranges());
        slots[1].title = "Sales".to_string();
        slots[1].checklist = vec![item("x", "Send quote", false), item("y", "Follow up", false)];

        let (todo, updated) = move_task_to_memo(1, "x", &slots, &[], now).expect("task should move");
        assert_eq!(todo.text, "[오후] Sales: Send quote");
        assert!(!todo.completed);
        assert_eq!(todo.created_at, now);
        assert_eq!(updated[1].checklist, vec![item("y", "Follow up", false)]);
        assert_eq!(updated[0], slots[0]);
    }

    #[test]
    fn moved_todo_id_is_new_to_the_pad() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 18, 5, 0).unwrap();
        let mut slots = generate_slots(&[], &default_time_ranges());
        slots[0].checklist = vec![item("x", "Call bank", false)];
        let pad: Vec<TodoItem> = (0..32)
            .map(|index| TodoItem {
                id: format!("todo{index:04}"),
                text: "older".to_string(),
                completed: false,
                created_at: now,
            })
            .collect();

        let (todo, _) = move_task_to_memo(0, "x", &slots, &pad, now).expect("task should move");
        assert!(pad.iter().all(|existing| existing.id != todo.id));
    }

    #[test]
    fn moving_a_missing_task_changes_nothing() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 18, 5, 0).unwrap();
        let slots = generate_slots(&[], &default_time_ranges());
        assert_eq!(
            move_task_to_memo(99, "x", &slots, &[], now),
            Err(MoveTaskError::SlotNotFound { slot_id: 99 })
        );
        assert!(matches!(
            move_task_to_memo(0, "x", &slots, &[], now),
            Err(MoveTaskError::ItemNotFound { slot_id: 0, .. })
        ));
    }

    #[test]
    fn history_grid_is_monday_aligned() {
        let mut routine = routine();
        // 2026-06-10 is a Wednesday.
        let today = date(10);
        routine.daily_status.insert(
            date(8),
            DailyRoutineStatus {
                completed: true,
                ..DailyRoutineStatus::default()
            },
        );

        let grid = routine_history(&routine, today, 2);
        assert_eq!(grid.len(), 7);
        assert!(grid.iter().all(|row| row.len() == 2));

        let first_monday = grid[0][0].expect("past date");
        assert_eq!(first_monday.date, date(1));
        assert!(!first_monday.completed);
        assert!(grid[0][1].expect("this monday").completed);
        assert_eq!(grid[2][1].map(|cell| cell.date), Some(today));
        assert!(grid[3][1].is_none());
        assert!(grid[6][0].is_some());

        assert!(routine_history(&routine, today, 0).iter().all(Vec::is_empty));
    }
}
