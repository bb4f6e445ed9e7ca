use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{Day, SlotSettings, TimeRange, TimeSlot, WeekSchedule};
use crate::validate::{RangeOverlap, SettingsError, check_time_range_settings};

/// Builds the dense week grid: one slot per day and range, day-major. Content
/// of any prior slot with the same `(day, label)` is carried over; ids are
/// renumbered from zero.
pub fn generate_slots(existing: &[TimeSlot], time_ranges: &[TimeRange]) -> Vec<TimeSlot> {
    let carried: HashMap<(Day, &str), &TimeSlot> = existing
        .iter()
        .map(|slot| ((slot.day, slot.period.as_str()), slot))
        .collect();

    let mut slots = Vec::with_capacity(Day::ALL.len() * time_ranges.len());
    let mut next_id = 0u32;
    for day in Day::ALL {
        for range in time_ranges {
            let mut slot = TimeSlot::blank(next_id, day, range);
            if let Some(prior) = carried.get(&(day, range.label.as_str())) {
                slot.title = prior.title.clone();
                slot.note = prior.note.clone();
                slot.category = prior.category;
                slot.checklist = prior.checklist.clone();
            }
            slots.push(slot);
            next_id += 1;
        }
    }

    slots
}

/// What a time-range change would throw away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPreview {
    pub dropped_labels: Vec<String>,
    /// Slots with content whose range disappears.
    pub lost_slots: Vec<(Day, String)>,
}

impl MigrationPreview {
    pub fn is_lossy(&self) -> bool {
        !self.lost_slots.is_empty()
    }
}

pub fn migration_preview(schedule: &WeekSchedule, next: &[TimeRange]) -> MigrationPreview {
    let keeps = |label: &str| next.iter().any(|range| range.label == label);

    let dropped_labels = schedule
        .time_ranges()
        .iter()
        .filter(|range| !keeps(&range.label))
        .map(|range| range.label.clone())
        .collect();
    let lost_slots = schedule
        .visible_slots()
        .filter(|slot| slot.has_content() && !keeps(&slot.period))
        .map(|slot| (slot.day, slot.period.clone()))
        .collect();

    MigrationPreview {
        dropped_labels,
        lost_slots,
    }
}

/// Commits a new list of time ranges: checks it, regenerates every slot and
/// replaces the settings. Content under removed labels is dropped.
pub fn apply_time_ranges(
    schedule: &WeekSchedule,
    time_ranges: Vec<TimeRange>,
    now: DateTime<Utc>,
) -> Result<(WeekSchedule, Vec<RangeOverlap>), SettingsError> {
    let overlaps = check_time_range_settings(&time_ranges)?;
    let slots = generate_slots(&schedule.slots, &time_ranges);
    info!(
        ranges = time_ranges.len(),
        slots = slots.len(),
        "regenerated slots for new time ranges"
    );

    let next = WeekSchedule {
        slots,
        settings: SlotSettings {
            time_ranges,
            last_updated: now,
        },
        last_updated: now,
        ..schedule.clone()
    };
    Ok((next, overlaps))
}

/// Fresh, empty slots over `time_ranges`; routines are kept.
pub fn reset_slots(
    schedule: &WeekSchedule,
    time_ranges: Vec<TimeRange>,
    now: DateTime<Utc>,
) -> WeekSchedule {
    WeekSchedule {
        slots: generate_slots(&[], &time_ranges),
        settings: SlotSettings {
            time_ranges,
            last_updated: now,
        },
        last_updated: now,
        ..schedule.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Untouched,
    /// First load: the slot list was empty.
    Generated,
    /// The slot list was not the dense cross product of the configured ranges.
    Repaired,
}

/// Makes sure a loaded document carries exactly one slot per day and range.
pub fn reconcile_slots(schedule: WeekSchedule, now: DateTime<Utc>) -> (WeekSchedule, Reconciliation) {
    if schedule.is_dense() {
        return (schedule, Reconciliation::Untouched);
    }

    let outcome = if schedule.slots.is_empty() {
        Reconciliation::Generated
    } else {
        Reconciliation::Repaired
    };
    debug!(?outcome, slots = schedule.slots.len(), "reconciling slot grid");

    let slots = generate_slots(&schedule.slots, schedule.time_ranges());
    let next = WeekSchedule {
        slots,
        last_updated: now,
        ..schedule
    };
    (next, outcome)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::domain::{
        ChecklistItem, Day, SlotCategory, TimeRange, WeekSchedule, default_time_ranges,
    };
    use crate::validate::SettingsError;

    use super::{
        Reconciliation, apply_time_ranges, generate_slots, migration_preview, reconcile_slots,
        reset_slots,
    };

    fn three_ranges() -> Vec<TimeRange> {
        vec![
            TimeRange::new("오전", "08:00", "12:00"),
            TimeRange::new("오후", "13:00", "17:00"),
            TimeRange::new("저녁", "18:00", "21:00"),
        ]
    }

    fn item(id: &str) -> ChecklistItem {
        ChecklistItem {
            id: id.to_string(),
            text: format!("task {id}"),
            completed: false,
        }
    }

    #[test]
    fn generates_dense_blank_grid() {
        let ranges = three_ranges();
        let slots = generate_slots(&[], &ranges);
        assert_eq!(slots.len(), 7 * 3);
        for (index, slot) in slots.iter().enumerate() {
            assert_eq!(slot.id as usize, index);
            assert_eq!(slot.day, Day::ALL[index / 3]);
            assert_eq!(slot.time_range, ranges[index % 3]);
            assert_eq!(slot.period, ranges[index % 3].label);
            assert_eq!(slot.category, SlotCategory::Unassigned);
            assert!(slot.title.is_empty() && slot.note.is_empty() && slot.checklist.is_empty());
        }
    }

    #[test]
    fn empty_ranges_produce_no_slots() {
        assert!(generate_slots(&[], &[]).is_empty());
    }

    #[test]
    fn regeneration_carries_content_by_day_and_label() {
        let mut slots = generate_slots(&[], &default_time_ranges());
        slots[0].title = "T".to_string();
        slots[0].checklist = vec![item("x")];
        slots[0].category = SlotCategory::Strategy;
        assert_eq!((slots[0].day, slots[0].period.as_str()), (Day::Mon, "오전"));

        let widened = vec![
            TimeRange::new("새벽", "05:00", "07:00"),
            TimeRange::new("오전", "07:30", "11:30"),
        ];
        let regenerated = generate_slots(&slots, &widened);
        let carried = regenerated
            .iter()
            .find(|slot| slot.day == Day::Mon && slot.period == "오전")
            .expect("slot should exist");
        assert_eq!(carried.title, "T");
        assert_eq!(carried.checklist, vec![item("x")]);
        assert_eq!(carried.category, SlotCategory::Strategy);
        assert_eq!(carried.time_range.start, "07:30");
        assert_eq!(carried.id, 1);

        let narrowed = vec![TimeRange::new("오후", "13:00", "17:00")];
        let regenerated = generate_slots(&slots, &narrowed);
        assert!(regenerated.iter().all(|slot| slot.title != "T"));
        assert!(regenerated.iter().all(|slot| slot.checklist.is_empty()));
    }

    #[test]
    fn preview_lists_lost_content() {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let mut schedule = WeekSchedule::new(default_time_ranges(), now);
        schedule.slots = generate_slots(&[], schedule.time_ranges());
        schedule.slots[3].note = "gym".to_string();

        let keep_all = migration_preview(&schedule, &three_ranges());
        assert!(!keep_all.is_lossy());
        assert!(keep_all.dropped_labels.is_empty());

        let preview = migration_preview(&schedule, &[TimeRange::new("오전", "08:00", "12:00")]);
        assert_eq!(preview.dropped_labels, vec!["오후".to_string()]);
        assert_eq!(preview.lost_slots, vec![(Day::Tue, "오후".to_string())]);
        assert!(preview.is_lossy());
    }

    #[test]
    fn apply_time_ranges_regenerates_and_stamps() {
        let created = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap();
        let mut schedule = WeekSchedule::new(default_time_ranges(), created);
        schedule.slots = generate_slots(&[], schedule.time_ranges());
        schedule.slots[1].title = "Sales calls".to_string();

        let (next, overlaps) =
            apply_time_ranges(&schedule, three_ranges(), later).expect("ranges should apply");
        assert!(overlaps.is_empty());
        assert_eq!(next.slots.len(), 21);
        assert!(next.is_dense());
        assert_eq!(next.settings.last_updated, later);
        assert_eq!(next.last_updated, later);
        assert_eq!(
            next.slot_at(Day::Mon, "오후").map(|slot| slot.title.as_str()),
            Some("Sales calls")
        );
    }

    #[test]
    fn apply_time_ranges_rejects_duplicates_without_changes() {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let schedule = WeekSchedule::new(default_time_ranges(), now);
        let result = apply_time_ranges(
            &schedule,
            vec![
                TimeRange::new("오전", "08:00", "12:00"),
                TimeRange::new("오전", "13:00", "17:00"),
            ],
            now,
        );
        assert!(matches!(result, Err(SettingsError::DuplicateLabel { .. })));
    }

    #[test]
    fn reset_slots_drops_content_and_keeps_routines() {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let mut schedule = WeekSchedule::new(three_ranges(), now);
        schedule.slots = generate_slots(&[], schedule.time_ranges());
        schedule.slots[0].title = "Old".to_string();
        schedule.evening_routines.push(crate::domain::DailyRoutine {
            id: "r1".to_string(),
            text: "Journal".to_string(),
            note: None,
            daily_status: Default::default(),
        });

        let reset = reset_slots(&schedule, default_time_ranges(), now);
        assert_eq!(reset.slots.len(), 14);
        assert!(reset.slots.iter().all(|slot| !slot.has_content()));
        assert_eq!(reset.evening_routines.len(), 1);
    }

    #[test]
    fn reconcile_generates_repairs_or_leaves_alone() {
        let created = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 2, 2, 10, 0, 0).unwrap();
        let schedule = WeekSchedule::new(default_time_ranges(), created);

        let (generated, outcome) = reconcile_slots(schedule, later);
        assert_eq!(outcome, Reconciliation::Generated);
        assert_eq!(generated.slots.len(), 14);

        let (same, outcome) = reconcile_slots(generated.clone(), later);
        assert_eq!(outcome, Reconciliation::Untouched);
        assert_eq!(same, generated);

        let mut broken = generated;
        broken.slots[4].title = "Keep me".to_string();
        broken.slots.remove(0);
        let (repaired, outcome) = reconcile_slots(broken, later);
        assert_eq!(outcome, Reconciliation::Repaired);
        assert!(repaired.is_dense());
        assert_eq!(repaired.slots[4].title, "Keep me");
    }

    #[test]
    fn reconcile_renumbers_colliding_ids() {
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();
        let mut schedule = WeekSchedule::new(default_time_ranges(), now);
        schedule.slots = generate_slots(&[], schedule.time_ranges());
        schedule.slots[9].note = "Board prep".to_string();
        for slot in &mut schedule.slots {
            slot.id = 0;
        }
        assert!(!schedule.is_dense());

        let (repaired, outcome) = reconcile_slots(schedule, now);
        assert_eq!(outcome, Reconciliation::Repaired);
        let ids: Vec<u32> = repaired.slots.iter().map(|slot| slot.id).collect();
        assert_eq!(ids, (0..14).collect::<Vec<u32>>());
        assert_eq!(repaired.slots[9].note, "Board prep");
    }
}
