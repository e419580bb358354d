use std::env;
use std::path::PathBuf;

use chrono::FixedOffset;

use crate::clock::parse_utc_offset;
use crate::eligibility::{parse_hhmm, MealType, MealWindow, MealWindows};

pub const DEFAULT_ATTENDANCE_FILE: &str = "data/attendance.json";
pub const DEFAULT_MEALS_FILE: &str = "data/meals.json";
pub const DEFAULT_AUDIT_LOG: &str = "data/meal-distribution-log.jsonl";
pub const DEFAULT_REPORT_DIR: &str = "reports";
pub const DEFAULT_UTC_OFFSET: &str = "+05:30";
pub const DEFAULT_TOTAL_STUDENTS: usize = 150;

#[derive(Debug, Clone)]
pub struct Config {
    pub attendance_file: PathBuf,
    pub meals_file: PathBuf,
    pub audit_log: PathBuf,
    pub report_dir: PathBuf,
    pub utc_offset: FixedOffset,
    pub total_students: usize,
    pub meal_windows: MealWindows,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let path = |key: &str, default: &str| PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()));

        let utc_offset = parse_utc_offset(
            &lookup("EDUTRAK_UTC_OFFSET").unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string()),
        )
        .map_err(|e| format!("EDUTRAK_UTC_OFFSET: {}", e))?;

        let total_students = match lookup("EDUTRAK_TOTAL_STUDENTS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| "EDUTRAK_TOTAL_STUDENTS must be a valid number")?,
            None => DEFAULT_TOTAL_STUDENTS,
        };

        let mut meal_windows = MealWindows::default();
        for meal_type in MealType::ALL {
            let key = format!("EDUTRAK_{}_WINDOW", meal_type.as_str().to_ascii_uppercase());
            let Some(raw) = lookup(&key) else { continue };

            let mut window = MealWindow::parse(&raw).map_err(|e| format!("{}: {}", key, e))?;
            if let Some(cutoff) = meal_windows.get(meal_type).arrival_cutoff() {
                window = window.with_arrival_cutoff(cutoff);
            }
            meal_windows = meal_windows.with_window(meal_type, window);
        }

        if let Some(raw) = lookup("EDUTRAK_BREAKFAST_CUTOFF") {
            let cutoff = parse_hhmm(&raw).map_err(|e| format!("EDUTRAK_BREAKFAST_CUTOFF: {}", e))?;
            let breakfast = meal_windows.breakfast.with_arrival_cutoff(cutoff);
            meal_windows = meal_windows.with_window(MealType::Breakfast, breakfast);
        }

        Ok(Self {
            attendance_file: path("EDUTRAK_ATTENDANCE_FILE", DEFAULT_ATTENDANCE_FILE),
            meals_file: path("EDUTRAK_MEALS_FILE", DEFAULT_MEALS_FILE),
            audit_log: path("EDUTRAK_AUDIT_LOG", DEFAULT_AUDIT_LOG),
            report_dir: path("EDUTRAK_REPORT_DIR", DEFAULT_REPORT_DIR),
            utc_offset,
            total_students,
            meal_windows,
        })
    }
}
