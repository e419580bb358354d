//! Core data types for attendance and meal eligibility

use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::eligibility::error::EligibilityError;

/// Parse a 24-hour `HH:MM` wall-clock time.
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, EligibilityError> {
    NaiveTime::parse_from_str(raw.trim(), hhmm::FORMAT)
        .map_err(|_| EligibilityError::invalid_time(raw))
}

/// Minutes elapsed since local midnight, seconds discarded.
pub fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Drop seconds and sub-second precision from a wall-clock time.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Serde adapter storing `NaiveTime` as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hhmm(&raw).map_err(de::Error::custom)
    }

    /// Same as the parent module, for optional fields.
    pub mod option {
        use chrono::NaiveTime;
        use serde::{de, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => serializer.collect_str(&time.format(super::FORMAT)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_hhmm(&raw).map_err(de::Error::custom))
                .transpose()
        }
    }
}

/// Attendance status of a check-in record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Meal types served during the school day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Snack,
}

impl MealType {
    /// Every meal type, in serving order.
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Snack];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attendance check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub student_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// `true` for a `present` record on `date`.
    pub fn is_present_on(&self, date: NaiveDate) -> bool {
        self.date == date && self.status == AttendanceStatus::Present
    }
}

/// A single meal handed to a student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub student_id: String,
    pub student_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub meal_type: MealType,
    pub distributed_by: String,
}

/// Discriminant of a validation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    Eligible,
    NoAttendance,
    AlreadyReceived,
    /// Student id has no attendance on any date. Only produced by the
    /// distribution desk lookup, never by the engine.
    NotFound,
    TimeRestriction,
    LateAttendance,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::Eligible => "ELIGIBLE",
            ValidationCode::NoAttendance => "NO_ATTENDANCE",
            ValidationCode::AlreadyReceived => "ALREADY_RECEIVED",
            ValidationCode::NotFound => "NOT_FOUND",
            ValidationCode::TimeRestriction => "TIME_RESTRICTION",
            ValidationCode::LateAttendance => "LATE_ATTENDANCE",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one student for one meal on one date.
///
/// Each variant carries exactly the snapshots its code guarantees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Eligible {
        attendance: AttendanceRecord,
    },
    NoAttendance,
    AlreadyReceived {
        attendance: AttendanceRecord,
        meal: MealRecord,
    },
    TimeRestriction {
        attendance: AttendanceRecord,
        meal_type: MealType,
        start: NaiveTime,
        end: NaiveTime,
    },
    LateAttendance {
        attendance: AttendanceRecord,
        meal_type: MealType,
        cutoff: NaiveTime,
    },
}

impl ValidationResult {
    pub fn code(&self) -> ValidationCode {
        match self {
            ValidationResult::Eligible { .. } => ValidationCode::Eligible,
            ValidationResult::NoAttendance => ValidationCode::NoAttendance,
            ValidationResult::AlreadyReceived { .. } => ValidationCode::AlreadyReceived,
            ValidationResult::TimeRestriction { .. } => ValidationCode::TimeRestriction,
            ValidationResult::LateAttendance { .. } => ValidationCode::LateAttendance,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, ValidationResult::Eligible { .. })
    }

    /// Human-readable explanation of the outcome.
    pub fn reason(&self) -> String {
        match self {
            ValidationResult::Eligible { .. } => {
                "Student is eligible for meal distribution".to_string()
            }
            ValidationResult::NoAttendance => {
                "Student has not marked attendance for this date".to_string()
            }
            ValidationResult::AlreadyReceived { meal, .. } => format!(
                "Student has already received {} on {}",
                meal.meal_type, meal.date
            ),
            ValidationResult::TimeRestriction { meal_type, start, end, .. } => format!(
                "{} distribution is only allowed between {} and {}",
                meal_type,
                start.format(hhmm::FORMAT),
                end.format(hhmm::FORMAT)
            ),
            ValidationResult::LateAttendance { meal_type, cutoff, .. } => format!(
                "Student arrived too late for {} (after {})",
                meal_type,
                cutoff.format(hhmm::FORMAT)
            ),
        }
    }

    /// Attendance snapshot matched for the target date, if any.
    pub fn attendance(&self) -> Option<&AttendanceRecord> {
        match self {
            ValidationResult::NoAttendance => None,
            ValidationResult::Eligible { attendance }
            | ValidationResult::AlreadyReceived { attendance, .. }
            | ValidationResult::TimeRestriction { attendance, .. }
            | ValidationResult::LateAttendance { attendance, .. } => Some(attendance),
        }
    }

    /// Meal already handed out, only for `AlreadyReceived`.
    pub fn meal(&self) -> Option<&MealRecord> {
        match self {
            ValidationResult::AlreadyReceived { meal, .. } => Some(meal),
            _ => None,
        }
    }
}

/// Flat, serialisable view of a [`ValidationResult`] for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_eligible: bool,
    pub reason: String,
    pub validation_code: ValidationCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_info: Option<AttendanceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_info: Option<MealRecord>,
}

impl From<&ValidationResult> for ValidationReport {
    fn from(result: &ValidationResult) -> Self {
        Self {
            is_eligible: result.is_eligible(),
            reason: result.reason(),
            validation_code: result.code(),
            student_info: result.attendance().cloned(),
            meal_info: result.meal().cloned(),
        }
    }
}

/// Per-meal status line for one student on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealStatus {
    pub meal_type: MealType,
    pub is_eligible: bool,
    pub status: ValidationCode,
    pub reason: String,
    pub received: bool,
    #[serde(with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub received_at: Option<NaiveTime>,
}

/// Distribution figures for a single meal type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealTypeStats {
    pub meal_type: MealType,
    pub present: usize,
    pub distributed: usize,
    /// Present students who may still be served right now.
    pub eligible: usize,
    /// `distributed / eligible` as a whole percentage in `0..=100`.
    pub distribution_rate: u8,
}

/// Distribution statistics for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionStats {
    pub date: NaiveDate,
    pub total_present: usize,
    pub total_meals_distributed: usize,
    pub by_meal: Vec<MealTypeStats>,
}

impl DistributionStats {
    pub fn for_meal(&self, meal_type: MealType) -> Option<&MealTypeStats> {
        self.by_meal.iter().find(|s| s.meal_type == meal_type)
    }
}
