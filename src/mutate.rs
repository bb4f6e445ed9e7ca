use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    ChecklistItem, DailyRoutine, DailyRoutineStatus, RoutineTrack, SlotCategory, WeekSchedule,
    unique_id,
};

/// Fields to merge into a slot. `None` leaves the field alone; a provided
/// checklist replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotPatch {
    pub title: Option<String>,
    pub note: Option<String>,
    pub category: Option<SlotCategory>,
    pub checklist: Option<Vec<ChecklistItem>>,
}

impl SlotPatch {
    pub fn checklist(items: Vec<ChecklistItem>) -> Self {
        Self {
            checklist: Some(items),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.note.is_none() && self.category.is_none() && self.checklist.is_none()
    }
}

/// Partial update for one date of a routine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub completed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

pub fn update_slot(
    schedule: &WeekSchedule,
    slot_id: u32,
    patch: &SlotPatch,
    now: DateTime<Utc>,
) -> WeekSchedule {
    let mut next = stamped(schedule, now);
    if let Some(slot) = next.slots.iter_mut().find(|slot| slot.id == slot_id) {
        if let Some(title) = &patch.title {
            slot.title = title.clone();
        }
        if let Some(note) = &patch.note {
            slot.note = note.clone();
        }
        if let Some(category) = patch.category {
            slot.category = category;
        }
        if let Some(checklist) = &patch.checklist {
            slot.checklist = checklist.clone();
        }
    }
    next
}

/// Appends a routine with trimmed text. Blank text changes nothing but the
/// timestamp.
pub fn add_routine(
    schedule: &WeekSchedule,
    track: RoutineTrack,
    text: &str,
    now: DateTime<Utc>,
) -> WeekSchedule {
    let text = text.trim();
    let mut next = stamped(schedule, now);
    if text.is_empty() {
        return next;
    }

    // Ids stay unique across both tracks.
    let id = unique_id(
        next.morning_routines
            .iter()
            .chain(&next.evening_routines)
            .map(|routine| routine.id.as_str()),
    );
    routines_mut(&mut next, track).push(DailyRoutine {
        id,
        text: text.to_string(),
        note: None,
        daily_status: Default::default(),
    });
    next
}

pub fn remove_routine(
    schedule: &WeekSchedule,
    track: RoutineTrack,
    routine_id: &str,
    now: DateTime<Utc>,
) -> WeekSchedule {
    let mut next = stamped(schedule, now);
    routines_mut(&mut next, track).retain(|routine| routine.id != routine_id);
    next
}

/// Merges `update` into the routine's status for `date`, creating the entry
/// when the date has not been tracked yet.
pub fn update_routine_status(
    schedule: &WeekSchedule,
    track: RoutineTrack,
    routine_id: &str,
    date: NaiveDate,
    update: &StatusUpdate,
    now: DateTime<Utc>,
) -> WeekSchedule {
    let mut next = stamped(schedule, now);
    let routine = routines_mut(&mut next, track)
        .iter_mut()
        .find(|routine| routine.id == routine_id);
    if let Some(routine) = routine {
        let status: &mut DailyRoutineStatus = routine.daily_status.entry(date).or_default();
        if let Some(completed) = update.completed {
            status.completed = completed;
        }
        if let Some(completed_at) = update.completed_at {
            status.completed_at = Some(completed_at);
        }
        if let Some(note) = &update.note {
            status.note = Some(note.clone());
        }
    }
    next
}

pub fn add_checklist_item(items: &[ChecklistItem], text: &str) -> Vec<ChecklistItem> {
    let mut next = items.to_vec();
    let text = text.trim();
    if text.is_empty() {
        return next;
    }

    let id = unique_id(items.iter().map(|item| item.id.as_str()));
    next.push(ChecklistItem {
        id,
        text: text.to_string(),
        completed: false,
    });
    next
}

pub fn toggle_checklist_item(items: &[ChecklistItem], item_id: &str) -> Vec<ChecklistItem> {
    items
        .iter()
        .map(|item| {
            if item.id == item_id {
                ChecklistItem {
                    completed: !item.completed,
                    ..item.clone()
                }
            } else {
                item.clone()
            }
        })
        .collect()
}

pub fn remove_checklist_item(items: &[ChecklistItem], item_id: &str) -> Vec<ChecklistItem> {
    items
        .iter()
        .filter(|item| item.id != item_id)
        .cloned()
        .collect()
}

/// Moves an item to `to_index`, clamped to the end of the list.
pub fn move_checklist_item(items: &[ChecklistItem], item_id: &str, to_index: usize) -> Vec<ChecklistItem> {
    let mut next = items.to_vec();
    if let Some(from) = next.iter().position(|item| item.id == item_id) {
        let item = next.remove(from);
        let to_index = to_index.min(next.len());
        next.insert(to_index, item);
    }
    next
}

fn stamped(schedule: &WeekSchedule, now: DateTime<Utc>) -> WeekSchedule {
    WeekSchedule {
        last_updated: now,
        ..schedule.clone()
    }
}

fn routines_mut(schedule: &mut WeekSchedule, track: RoutineTrack) -> &mut Vec<DailyRoutine> {
    match track {
        RoutineTrack::Morning => &mut schedule.morning_routines,
        RoutineTrack::Evening => &mut schedule.evening_routines,
    }
}
