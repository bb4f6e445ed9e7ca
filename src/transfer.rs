use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DailyRoutine, SlotSettings, TimeSlot, WeekSchedule};
use crate::slots::{generate_slots, reconcile_slots};
use crate::validate::{
    SettingsError, ValidationError, check_time_range_settings, validate_routine_bundle,
    validate_schedule, validate_slot_bundle,
};

/// The `{ slots, settings }` sub-tree of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotBundle {
    pub slots: Vec<TimeSlot>,
    pub settings: SlotSettings,
}

/// The `{ morningRoutines, eveningRoutines }` sub-tree of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineBundle {
    pub morning_routines: Vec<DailyRoutine>,
    pub evening_routines: Vec<DailyRoutine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPart {
    All,
    Slots,
    Routines,
}

impl FromStr for ExportPart {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ExportPart::All),
            "slots" => Ok(ExportPart::Slots),
            "routines" => Ok(ExportPart::Routines),
            other => Err(format!("unknown part: {other} (expected all, slots or routines)")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("import file rejected: {0}")]
    Invalid(#[from] ValidationError),
    #[error("import file has unusable time ranges: {0}")]
    Ranges(#[from] SettingsError),
}

pub fn export(schedule: &WeekSchedule, part: ExportPart) -> Result<String, serde_json::Error> {
    match part {
        ExportPart::All => serde_json::to_string_pretty(schedule),
        ExportPart::Slots => serde_json::to_string_pretty(&SlotBundle {
            slots: schedule.slots.clone(),
            settings: schedule.settings.clone(),
        }),
        ExportPart::Routines => serde_json::to_string_pretty(&RoutineBundle {
            morning_routines: schedule.morning_routines.clone(),
            evening_routines: schedule.evening_routines.clone(),
        }),
    }
}

/// Parses and validates `text`, then returns `schedule` with the matching
/// sub-tree replaced. Nothing is returned on rejection.
pub fn import(
    schedule: &WeekSchedule,
    part: ExportPart,
    text: &str,
    now: DateTime<Utc>,
) -> Result<WeekSchedule, ImportError> {
    let candidate: serde_json::Value = serde_json::from_str(text)?;

    let next = match part {
        ExportPart::All => {
            let imported = validate_schedule(&candidate)?;
            check_time_range_settings(imported.time_ranges())?;
            reconcile_slots(imported, now).0
        }
        ExportPart::Slots => {
            let bundle = validate_slot_bundle(&candidate)?;
            check_time_range_settings(&bundle.settings.time_ranges)?;
            WeekSchedule {
                slots: generate_slots(&bundle.slots, &bundle.settings.time_ranges),
                settings: bundle.settings,
                ..schedule.clone()
            }
        }
        ExportPart::Routines => {
            let bundle = validate_routine_bundle(&candidate)?;
            WeekSchedule {
                morning_routines: bundle.morning_routines,
                evening_routines: bundle.evening_routines,
                ..schedule.clone()
            }
        }
    };

    Ok(WeekSchedule {
        last_updated: now,
        ..next
    })
}
