use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;

/// Day of the planning week. Serialized with the short Korean labels the
/// stored documents have always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    #[serde(rename = "월")]
    Mon,
    #[serde(rename = "화")]
    Tue,
    #[serde(rename = "수")]
    Wed,
    #[serde(rename = "목")]
    Thu,
    #[serde(rename = "금")]
    Fri,
    #[serde(rename = "토")]
    Sat,
    #[serde(rename = "일")]
    Sun,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Mon,
        Day::Tue,
        Day::Wed,
        Day::Thu,
        Day::Fri,
        Day::Sat,
        Day::Sun,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Day::Mon => "월",
            Day::Tue => "화",
            Day::Wed => "수",
            Day::Thu => "목",
            Day::Fri => "금",
            Day::Sat => "토",
            Day::Sun => "일",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Day::Mon => "Mon",
            Day::Tue => "Tue",
            Day::Wed => "Wed",
            Day::Thu => "Thu",
            Day::Fri => "Fri",
            Day::Sat => "Sat",
            Day::Sun => "Sun",
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Mon,
            Weekday::Tue => Day::Tue,
            Weekday::Wed => Day::Wed,
            Weekday::Thu => Day::Thu,
            Weekday::Fri => Day::Fri,
            Weekday::Sat => Day::Sat,
            Weekday::Sun => Day::Sun,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Day::ALL.into_iter().find(|day| day.label() == label)
    }
}

impl Display for Day {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Day {
    type Err = String;

    /// Accepts the stored label (`월`), an English name (`mon`, `Monday`)
    /// or a 1-based weekday number starting on Monday.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        if let Some(day) = Day::from_label(value) {
            return Ok(day);
        }

        if let Ok(number) = value.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|index| Day::ALL.get(index).copied())
                .ok_or_else(|| format!("day number must be 1-7, got {number}"));
        }

        let lowered = value.to_ascii_lowercase();
        Day::ALL
            .into_iter()
            .find(|day| {
                let short = day.short_name().to_ascii_lowercase();
                lowered.len() >= 3 && (lowered == short || lowered.starts_with(&short))
            })
            .ok_or_else(|| format!("unknown day: {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCategory {
    Personal,
    Family,
    Team,
    Organization,
    Strategy,
    Business,
    Unassigned,
}

/// Static display metadata for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMeta {
    pub name: &'static str,
    pub color: &'static str,
    /// Recommended number of slots per week, as an inclusive range.
    pub recommended: Option<(usize, usize)>,
}

impl SlotCategory {
    pub const ALL: [SlotCategory; 7] = [
        SlotCategory::Personal,
        SlotCategory::Family,
        SlotCategory::Team,
        SlotCategory::Organization,
        SlotCategory::Strategy,
        SlotCategory::Business,
        SlotCategory::Unassigned,
    ];

    pub fn meta(self) -> CategoryMeta {
        match self {
            SlotCategory::Personal => CategoryMeta {
                name: "개인 충전/회복",
                color: "blue",
                recommended: Some((2, 2)),
            },
            SlotCategory::Family => CategoryMeta {
                name: "가족/연인",
                color: "pink",
                recommended: Some((1, 2)),
            },
            SlotCategory::Team => CategoryMeta {
                name: "팀원 관리",
                color: "purple",
                recommended: Some((1, 1)),
            },
            SlotCategory::Organization => CategoryMeta {
                name: "조직 문화/시스템",
                color: "yellow",
                recommended: Some((1, 1)),
            },
            SlotCategory::Strategy => CategoryMeta {
                name: "전략/방향",
                color: "green",
                recommended: Some((1, 1)),
            },
            SlotCategory::Business => CategoryMeta {
                name: "고객/사업개발",
                color: "orange",
                recommended: Some((6, 8)),
            },
            SlotCategory::Unassigned => CategoryMeta {
                name: "미지정",
                color: "gray",
                recommended: None,
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.meta().name
    }

    pub fn key(self) -> &'static str {
        match self {
            SlotCategory::Personal => "personal",
            SlotCategory::Family => "family",
            SlotCategory::Team => "team",
            SlotCategory::Organization => "organization",
            SlotCategory::Strategy => "strategy",
            SlotCategory::Business => "business",
            SlotCategory::Unassigned => "unassigned",
        }
    }

    pub fn next(self) -> Self {
        let index = SlotCategory::ALL
            .iter()
            .position(|category| *category == self)
            .unwrap_or(0);
        SlotCategory::ALL[(index + 1) % SlotCategory::ALL.len()]
    }
}

impl FromStr for SlotCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim().to_ascii_lowercase();
        SlotCategory::ALL
            .into_iter()
            .find(|category| category.key() == value)
            .ok_or_else(|| {
                let known = SlotCategory::ALL
                    .iter()
                    .map(|category| category.key())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unknown category: {raw} (expected one of {known})")
            })
    }
}

/// A named span of the day shared by all seven days. `start` and `end` are
/// zero-padded `HH:MM` strings, so string order is clock order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub label: String,
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn new(label: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn contains(&self, time: &str) -> bool {
        self.start.as_str() <= time && time <= self.end.as_str()
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}-{}", self.label, self.start, self.end)
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Parses `LABEL=HH:MM-HH:MM`, normalizing both clock values.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (label, span) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected LABEL=HH:MM-HH:MM, got {raw}"))?;
        let (start, end) = span
            .split_once('-')
            .ok_or_else(|| format!("expected HH:MM-HH:MM after '=', got {span}"))?;
        let start = normalize_clock(start).ok_or_else(|| format!("invalid start time: {start}"))?;
        let end = normalize_clock(end).ok_or_else(|| format!("invalid end time: {end}"))?;
        Ok(TimeRange::new(label.trim(), start, end))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: u32,
    pub day: Day,
    /// Label of the time range this slot belongs to.
    pub period: String,
    pub category: SlotCategory,
    pub title: String,
    pub note: String,
    pub checklist: Vec<ChecklistItem>,
    pub time_range: TimeRange,
}

impl TimeSlot {
    pub fn blank(id: u32, day: Day, time_range: &TimeRange) -> Self {
        Self {
            id,
            day,
            period: time_range.label.clone(),
            category: SlotCategory::Unassigned,
            title: String::new(),
            note: String::new(),
            checklist: Vec::new(),
            time_range: time_range.clone(),
        }
    }

    pub fn has_content(&self) -> bool {
        !self.title.is_empty()
            || !self.note.is_empty()
            || !self.checklist.is_empty()
            || self.category != SlotCategory::Unassigned
    }

    /// Title if set, otherwise the category's display name.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            self.category.name()
        } else {
            self.title.as_str()
        }
    }

    /// Human-readable origin used when a task leaves its slot.
    pub fn origin_label(&self) -> String {
        format!("[{}] {}", self.time_range.label, self.display_title())
    }

    pub fn completed_count(&self) -> usize {
        self.checklist.iter().filter(|item| item.completed).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRoutineStatus {
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRoutine {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub daily_status: BTreeMap<NaiveDate, DailyRoutineStatus>,
}

impl DailyRoutine {
    pub fn status(&self, date: NaiveDate) -> Option<&DailyRoutineStatus> {
        self.daily_status.get(&date)
    }

    pub fn is_completed_on(&self, date: NaiveDate) -> bool {
        self.status(date).is_some_and(|status| status.completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineTrack {
    Morning,
    Evening,
}

impl RoutineTrack {
    pub fn name(self) -> &'static str {
        match self {
            RoutineTrack::Morning => "morning",
            RoutineTrack::Evening => "evening",
        }
    }
}

impl FromStr for RoutineTrack {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "morning" | "am" | "start" => Ok(RoutineTrack::Morning),
            "evening" | "pm" | "end" => Ok(RoutineTrack::Evening),
            other => Err(format!("unknown routine track: {other} (expected morning or evening)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSettings {
    pub time_ranges: Vec<TimeRange>,
    pub last_updated: DateTime<Utc>,
}

/// The persisted root document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSchedule {
    pub slots: Vec<TimeSlot>,
    pub morning_routines: Vec<DailyRoutine>,
    pub evening_routines: Vec<DailyRoutine>,
    pub settings: SlotSettings,
    pub last_updated: DateTime<Utc>,
}

impl WeekSchedule {
    /// A fresh document with no slots yet; the generator fills them in on
    /// first load.
    pub fn new(time_ranges: Vec<TimeRange>, now: DateTime<Utc>) -> Self {
        Self {
            slots: Vec::new(),
            morning_routines: Vec::new(),
            evening_routines: Vec::new(),
            settings: SlotSettings {
                time_ranges,
                last_updated: now,
            },
            last_updated: now,
        }
    }

    pub fn time_ranges(&self) -> &[TimeRange] {
        &self.settings.time_ranges
    }

    pub fn slot(&self, id: u32) -> Option<&TimeSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn routines(&self, track: RoutineTrack) -> &[DailyRoutine] {
        match track {
            RoutineTrack::Morning => &self.morning_routines,
            RoutineTrack::Evening => &self.evening_routines,
        }
    }

    pub fn routine(&self, track: RoutineTrack, routine_id: &str) -> Option<&DailyRoutine> {
        self.routines(track)
            .iter()
            .find(|routine| routine.id == routine_id)
    }

    /// Slots whose time range is still configured. Orphans left behind by a
    /// removed range are hidden until the next regeneration drops them.
    pub fn visible_slots(&self) -> impl Iterator<Item = &TimeSlot> + '_ {
        self.slots.iter().filter(|slot| {
            self.settings
                .time_ranges
                .iter()
                .any(|range| range.label == slot.time_range.label)
        })
    }

    pub fn slot_at(&self, day: Day, label: &str) -> Option<&TimeSlot> {
        self.visible_slots()
            .find(|slot| slot.day == day && slot.period == label)
    }

    /// True when the slots form exactly one entry per (day, range) pair,
    /// ids are distinct, and every denormalized range matches the configured
    /// one.
    pub fn is_dense(&self) -> bool {
        let ranges = &self.settings.time_ranges;
        if self.slots.len() != Day::ALL.len() * ranges.len() {
            return false;
        }

        let ids: HashSet<u32> = self.slots.iter().map(|slot| slot.id).collect();
        if ids.len() != self.slots.len() {
            return false;
        }

        let mut seen: HashMap<(Day, &str), usize> = HashMap::new();
        for slot in &self.slots {
            let Some(range) = ranges.iter().find(|range| range.label == slot.period) else {
                return false;
            };
            if slot.time_range != *range {
                return false;
            }
            *seen.entry((slot.day, slot.period.as_str())).or_insert(0) += 1;
        }

        seen.len() == self.slots.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoEntry {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

pub fn default_time_ranges() -> Vec<TimeRange> {
    vec![
        TimeRange::new("오전", "08:00", "12:00"),
        TimeRange::new("오후", "13:00", "17:00"),
    ]
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

/// Generates an id that does not collide with any of `existing`.
pub fn unique_id<'a>(existing: impl Iterator<Item = &'a str> + Clone) -> String {
    loop {
        let id = generate_id();
        if !existing.clone().any(|taken| taken == id) {
            return id;
        }
    }
}

/// Zero-pads a loose `H:MM` clock value into `HH:MM`.
pub fn normalize_clock(raw: &str) -> Option<String> {
    let (hours, minutes) = raw.trim().split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    let hours = hours.parse::<u32>().ok()?;
    let minutes = minutes.parse::<u32>().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(format!("{hours:02}:{minutes:02}"))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc, Weekday};

    use super::{
        Day, RoutineTrack, SlotCategory, TimeRange, TimeSlot, WeekSchedule, default_time_ranges,
        normalize_clock, unique_id,
    };

    #[test]
    fn parses_days_from_labels_names_and_numbers() {
        assert_eq!("월".parse::<Day>(), Ok(Day::Mon));
        assert_eq!("sunday".parse::<Day>(), Ok(Day::Sun));
        assert_eq!("Wed".parse::<Day>(), Ok(Day::Wed));
        assert_eq!("5".parse::<Day>(), Ok(Day::Fri));
        assert!("8".parse::<Day>().is_err());
        assert!("mo".parse::<Day>().is_err());
        assert_eq!(Day::from_weekday(Weekday::Sun), Day::Sun);
    }

    #[test]
    fn serializes_days_with_stored_labels() {
        let encoded = serde_json::to_string(&Day::Thu).expect("day should encode");
        assert_eq!(encoded, "\"목\"");
        let decoded: Day = serde_json::from_str("\"토\"").expect("day should decode");
        assert_eq!(decoded, Day::Sat);
    }

    #[test]
    fn category_cycle_visits_every_variant() {
        let mut category = SlotCategory::Personal;
        for _ in 0..SlotCategory::ALL.len() {
            category = category.next();
        }
        assert_eq!(category, SlotCategory::Personal);
        assert_eq!("Business".parse::<SlotCategory>(), Ok(SlotCategory::Business));
        assert!(SlotCategory::Unassigned.meta().recommended.is_none());
    }

    #[test]
    fn parses_time_range_arguments() {
        let range: TimeRange = "저녁=9:30-21:00".parse().expect("range should parse");
        assert_eq!(range, TimeRange::new("저녁", "09:30", "21:00"));
        assert!("저녁=25:00-26:00".parse::<TimeRange>().is_err());
        assert!("no-separator".parse::<TimeRange>().is_err());
    }

    #[test]
    fn normalizes_clock_values() {
        assert_eq!(normalize_clock("8:05").as_deref(), Some("08:05"));
        assert_eq!(normalize_clock("23:59").as_deref(), Some("23:59"));
        assert_eq!(normalize_clock("24:00"), None);
        assert_eq!(normalize_clock("12:5"), None);
    }

    #[test]
    fn display_title_falls_back_to_category_name() {
        let range = TimeRange::new("오전", "08:00", "12:00");
        let mut slot = TimeSlot::blank(0, Day::Mon, &range);
        slot.category = SlotCategory::Team;
        assert_eq!(slot.origin_label(), "[오전] 팀원 관리");
        slot.title = "1:1 meetings".to_string();
        assert_eq!(slot.origin_label(), "[오전] 1:1 meetings");
    }

    #[test]
    fn new_schedule_is_not_dense_until_generated() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let schedule = WeekSchedule::new(default_time_ranges(), now);
        assert!(schedule.slots.is_empty());
        assert!(!schedule.is_dense());
        assert!(schedule.routines(RoutineTrack::Evening).is_empty());
    }

    #[test]
    fn unique_id_avoids_existing_ids() {
        let taken = ["abc".to_string()];
        let id = unique_id(taken.iter().map(String::as_str));
        assert_eq!(id.len(), 8);
        assert_ne!(id, "abc");
    }
}
