//! Meal time window configuration

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::eligibility::error::EligibilityError;
use crate::eligibility::types::{hhmm, minutes_since_midnight, parse_hhmm, MealType};

/// Serving window for a single meal type.
///
/// Both bounds are inclusive and compared at minute precision. Windows never
/// cross midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealWindow {
    #[serde(with = "hhmm")]
    start: NaiveTime,
    #[serde(with = "hhmm")]
    end: NaiveTime,
    /// Latest check-in time that still qualifies for this meal.
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    arrival_cutoff: Option<NaiveTime>,
}

impl MealWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, EligibilityError> {
        if minutes_since_midnight(end) < minutes_since_midnight(start) {
            return Err(EligibilityError::InvalidWindow {
                start: start.format(hhmm::FORMAT).to_string(),
                end: end.format(hhmm::FORMAT).to_string(),
            });
        }
        Ok(Self {
            start,
            end,
            arrival_cutoff: None,
        })
    }

    /// Parse a window written as `HH:MM-HH:MM`.
    pub fn parse(raw: &str) -> Result<Self, EligibilityError> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| EligibilityError::invalid_window_format(raw))?;
        Self::new(parse_hhmm(start)?, parse_hhmm(end)?)
    }

    pub fn with_arrival_cutoff(mut self, cutoff: NaiveTime) -> Self {
        self.arrival_cutoff = Some(cutoff);
        self
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn arrival_cutoff(&self) -> Option<NaiveTime> {
        self.arrival_cutoff
    }

    /// `true` when `now` falls inside `[start, end]`.
    pub fn contains(&self, now: NaiveTime) -> bool {
        let now = minutes_since_midnight(now);
        now >= minutes_since_midnight(self.start) && now <= minutes_since_midnight(self.end)
    }

    /// `true` when `arrival` is strictly after the cutoff, if one is set.
    pub fn is_late_arrival(&self, arrival: NaiveTime) -> bool {
        self.arrival_cutoff
            .is_some_and(|cutoff| minutes_since_midnight(arrival) > minutes_since_midnight(cutoff))
    }
}

/// Immutable table of serving windows, one per meal type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealWindows {
    pub breakfast: MealWindow,
    pub lunch: MealWindow,
    pub snack: MealWindow,
}

impl MealWindows {
    pub fn get(&self, meal_type: MealType) -> &MealWindow {
        match meal_type {
            MealType::Breakfast => &self.breakfast,
            MealType::Lunch => &self.lunch,
            MealType::Snack => &self.snack,
        }
    }

    /// Replace the window for one meal type, returning the updated table.
    pub fn with_window(mut self, meal_type: MealType, window: MealWindow) -> Self {
        match meal_type {
            MealType::Breakfast => self.breakfast = window,
            MealType::Lunch => self.lunch = window,
            MealType::Snack => self.snack = window,
        }
        self
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for MealWindows {
    fn default() -> Self {
        Self {
            breakfast: MealWindow {
                start: hm(7, 0),
                end: hm(10, 0),
                arrival_cutoff: Some(hm(9, 30)),
            },
            lunch: MealWindow {
                start: hm(11, 30),
                end: hm(14, 30),
                arrival_cutoff: None,
            },
            snack: MealWindow {
                start: hm(15, 0),
                end: hm(17, 0),
                arrival_cutoff: None,
            },
        }
    }
}
