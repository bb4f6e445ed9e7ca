use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{
    DailyRoutine, SlotSettings, TimeRange, TimeSlot, WeekSchedule, normalize_clock,
};
use crate::transfer::{RoutineBundle, SlotBundle};

static CLOCK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").expect("clock pattern must compile")
});

pub const MAX_LABEL_CHARS: usize = 4;

/// Why a candidate document was rejected. `path` is a JSON path such as
/// `slots[3].timeRange.start`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("document must be a JSON object")]
    NotAnObject,
    #[error("{path} is missing")]
    Missing { path: String },
    #[error("{path} must be {expected}")]
    WrongType { path: String, expected: &'static str },
    #[error("{path} is not a valid HH:MM time: {value}")]
    BadClock { path: String, value: String },
    #[error("{path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

/// Rejections raised when committing a new list of time ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("at least one time range is required")]
    Empty,
    #[error("time range label must be 1-4 characters: '{label}'")]
    BadLabel { label: String },
    #[error("duplicate time range label: {label}")]
    DuplicateLabel { label: String },
    #[error("time range {label} has an invalid HH:MM time: {value}")]
    BadClock { label: String, value: String },
    #[error("time range {label} must start before it ends ({start} >= {end})")]
    Inverted {
        label: String,
        start: String,
        end: String,
    },
}

/// Two configured ranges that share some minutes. Allowed, but the current
/// slot lookup will pick the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeOverlap {
    pub first: String,
    pub second: String,
}

pub fn is_clock(value: &str) -> bool {
    CLOCK_PATTERN.is_match(value)
}

/// Checks an untyped candidate against the schedule schema and converts it.
/// Any single violation rejects the whole document.
pub fn validate_schedule(candidate: &Value) -> Result<WeekSchedule, ValidationError> {
    let document = candidate.as_object().ok_or(ValidationError::NotAnObject)?;
    let slots = require_array(document, "slots", "slots")?;
    let morning = require_array(document, "morningRoutines", "morningRoutines")?;
    let evening = require_array(document, "eveningRoutines", "eveningRoutines")?;
    let (settings, ranges) = require_settings(document)?;

    check_slots(slots)?;
    check_time_ranges(ranges, "settings.timeRanges")?;

    Ok(WeekSchedule {
        slots: convert_each(slots, "slots")?,
        morning_routines: convert_each::<DailyRoutine>(morning, "morningRoutines")?,
        evening_routines: convert_each::<DailyRoutine>(evening, "eveningRoutines")?,
        settings: convert(settings, "settings")?,
        // Older documents carry no stamp; the epoch marks it as unknown.
        last_updated: match document.get("lastUpdated") {
            Some(value) => convert(value, "lastUpdated")?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        },
    })
}

/// The `{ slots, settings }` export shape.
pub fn validate_slot_bundle(candidate: &Value) -> Result<SlotBundle, ValidationError> {
    let document = candidate.as_object().ok_or(ValidationError::NotAnObject)?;
    let slots = require_array(document, "slots", "slots")?;
    let (settings, ranges) = require_settings(document)?;

    check_slots(slots)?;
    check_time_ranges(ranges, "settings.timeRanges")?;

    Ok(SlotBundle {
        slots: convert_each::<TimeSlot>(slots, "slots")?,
        settings: convert::<SlotSettings>(settings, "settings")?,
    })
}

/// The `{ morningRoutines, eveningRoutines }` export shape.
pub fn validate_routine_bundle(candidate: &Value) -> Result<RoutineBundle, ValidationError> {
    let document = candidate.as_object().ok_or(ValidationError::NotAnObject)?;
    let morning = require_array(document, "morningRoutines", "morningRoutines")?;
    let evening = require_array(document, "eveningRoutines", "eveningRoutines")?;

    Ok(RoutineBundle {
        morning_routines: convert_each(morning, "morningRoutines")?,
        evening_routines: convert_each(evening, "eveningRoutines")?,
    })
}

/// Checks a list of time ranges before it replaces the configured one.
/// Returns the overlapping pairs, which are tolerated.
pub fn check_time_range_settings(ranges: &[TimeRange]) -> Result<Vec<RangeOverlap>, SettingsError> {
    if ranges.is_empty() {
        return Err(SettingsError::Empty);
    }

    let mut labels = HashSet::new();
    for range in ranges {
        let chars = range.label.trim().chars().count();
        if chars == 0 || chars > MAX_LABEL_CHARS || range.label.trim() != range.label {
            return Err(SettingsError::BadLabel {
                label: range.label.clone(),
            });
        }
        if !labels.insert(range.label.as_str()) {
            return Err(SettingsError::DuplicateLabel {
                label: range.label.clone(),
            });
        }

        for value in [&range.start, &range.end] {
            if normalize_clock(value).as_deref() != Some(value.as_str()) {
                return Err(SettingsError::BadClock {
                    label: range.label.clone(),
                    value: value.clone(),
                });
            }
        }

        if range.start >= range.end {
            return Err(SettingsError::Inverted {
                label: range.label.clone(),
                start: range.start.clone(),
                end: range.end.clone(),
            });
        }
    }

    let mut sorted = ranges.iter().collect::<Vec<_>>();
    sorted.sort_by(|left, right| left.start.cmp(&right.start));
    let overlaps = sorted
        .windows(2)
        .filter(|pair| pair[1].start < pair[0].end)
        .map(|pair| RangeOverlap {
            first: pair[0].label.clone(),
            second: pair[1].label.clone(),
        })
        .collect();

    Ok(overlaps)
}

fn check_slots(slots: &[Value]) -> Result<(), ValidationError> {
    for (index, slot) in slots.iter().enumerate() {
        check_slot(slot, &format!("slots[{index}]"))?;
    }
    Ok(())
}

fn check_slot(slot: &Value, path: &str) -> Result<(), ValidationError> {
    let fields = slot.as_object().ok_or_else(|| ValidationError::WrongType {
        path: path.to_string(),
        expected: "an object",
    })?;

    let id = require(fields, "id", path)?;
    if !id.is_u64() {
        return Err(ValidationError::WrongType {
            path: format!("{path}.id"),
            expected: "an integer",
        });
    }

    for name in ["day", "period", "title", "note", "category"] {
        require_string(fields, name, path)?;
    }
    require_array(fields, "checklist", &format!("{path}.checklist"))?;
    check_time_range(require(fields, "timeRange", path)?, &format!("{path}.timeRange"))
}

fn check_time_ranges(ranges: &[Value], path: &str) -> Result<(), ValidationError> {
    for (index, range) in ranges.iter().enumerate() {
        check_time_range(range, &format!("{path}[{index}]"))?;
    }
    Ok(())
}

fn check_time_range(range: &Value, path: &str) -> Result<(), ValidationError> {
    let fields = range.as_object().ok_or_else(|| ValidationError::WrongType {
        path: path.to_string(),
        expected: "an object",
    })?;

    require_string(fields, "label", path)?;
    for name in ["start", "end"] {
        let value = require_string(fields, name, path)?;
        if !is_clock(value) {
            return Err(ValidationError::BadClock {
                path: format!("{path}.{name}"),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

fn require_settings(
    document: &Map<String, Value>,
) -> Result<(&Value, &Vec<Value>), ValidationError> {
    let settings = require(document, "settings", "settings")?;
    let fields = settings.as_object().ok_or_else(|| ValidationError::WrongType {
        path: "settings".to_string(),
        expected: "an object",
    })?;
    let ranges = require_array(fields, "timeRanges", "settings.timeRanges")?;
    Ok((settings, ranges))
}

fn require<'a>(
    fields: &'a Map<String, Value>,
    name: &str,
    path: &str,
) -> Result<&'a Value, ValidationError> {
    fields.get(name).ok_or_else(|| ValidationError::Missing {
        path: join_path(path, name),
    })
}

fn require_string<'a>(
    fields: &'a Map<String, Value>,
    name: &str,
    path: &str,
) -> Result<&'a str, ValidationError> {
    require(fields, name, path)?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            path: join_path(path, name),
            expected: "a string",
        })
}

/// `path` here is the full path of the array itself.
fn require_array<'a>(
    fields: &'a Map<String, Value>,
    name: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ValidationError> {
    fields
        .get(name)
        .ok_or_else(|| ValidationError::Missing {
            path: path.to_string(),
        })?
        .as_array()
        .ok_or_else(|| ValidationError::WrongType {
            path: path.to_string(),
            expected: "an array",
        })
}

fn join_path(path: &str, name: &str) -> String {
    if path == name || path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn convert<T: DeserializeOwned>(value: &Value, path: &str) -> Result<T, ValidationError> {
    T::deserialize(value).map_err(|err| ValidationError::Malformed {
        path: path.to_string(),
        reason: err.to_string(),
    })
}

fn convert_each<T: DeserializeOwned>(values: &[Value], path: &str) -> Result<Vec<T>, ValidationError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| convert(value, &format!("{path}[{index}]")))
        .collect()
}
