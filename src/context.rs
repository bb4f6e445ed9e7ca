use chrono::{Datelike, Local, NaiveDate};

use crate::domain::{Day, TimeRange, TimeSlot, WeekSchedule};

/// Where a moment falls relative to the configured ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStatus {
    BeforeDay,
    AfterDay,
    BetweenSlots,
    None,
}

/// What the "now" panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NowView<'a> {
    InSlot(&'a TimeSlot),
    BeforeDay { first_start: String },
    BetweenSlots { next: Option<TimeRange> },
    AfterDay,
    Idle,
}

/// The local wall clock as the resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMoment {
    pub date: NaiveDate,
    pub day: Day,
    /// `HH:MM`, comparable with range bounds.
    pub time: String,
}

impl LocalMoment {
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            date: now.date_naive(),
            day: Day::from_weekday(now.weekday()),
            time: now.format("%H:%M").to_string(),
        }
    }
}

/// First slot on `day` whose range contains `time`, bounds inclusive.
pub fn resolve_current_slot<'a>(
    slots: impl IntoIterator<Item = &'a TimeSlot>,
    day: Day,
    time: &str,
) -> Option<&'a TimeSlot> {
    slots
        .into_iter()
        .find(|slot| slot.day == day && slot.time_range.contains(time))
}

pub fn resolve_time_status(ranges: &[TimeRange], time: &str) -> TimeStatus {
    let mut sorted = ranges.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| left.start.cmp(&right.start));

    let Some(first) = sorted.first() else {
        return TimeStatus::None;
    };
    if time < first.start.as_str() {
        return TimeStatus::BeforeDay;
    }

    let latest_end = sorted
        .iter()
        .map(|range| range.end.as_str())
        .max()
        .unwrap_or_default();
    if time > latest_end {
        return TimeStatus::AfterDay;
    }

    let in_gap = sorted
        .windows(2)
        .any(|pair| time > pair[0].end.as_str() && time < pair[1].start.as_str());
    if in_gap {
        TimeStatus::BetweenSlots
    } else {
        TimeStatus::None
    }
}

pub fn resolve_now<'a>(schedule: &'a WeekSchedule, day: Day, time: &str) -> NowView<'a> {
    let ranges = schedule.time_ranges();
    if let Some(slot) = resolve_current_slot(schedule.visible_slots(), day, time) {
        return NowView::InSlot(slot);
    }

    match resolve_time_status(ranges, time) {
        TimeStatus::BeforeDay => NowView::BeforeDay {
            first_start: ranges
                .iter()
                .map(|range| range.start.clone())
                .min()
                .unwrap_or_default(),
        },
        TimeStatus::BetweenSlots => NowView::BetweenSlots {
            next: ranges
                .iter()
                .filter(|range| range.start.as_str() > time)
                .min_by(|left, right| left.start.cmp(&right.start))
                .cloned(),
        },
        TimeStatus::AfterDay => NowView::AfterDay,
        TimeStatus::None => NowView::Idle,
    }
}
