//! Eligibility Engine - decides who may receive which meal

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

use crate::audit::{AuditEntry, AuditError, AuditLog};
use crate::eligibility::{
    config::MealWindows,
    types::*,
};

/// Whole percentage of `part / whole`, rounded half-up and capped at 100.
/// Returns 0 when `whole` is 0.
pub fn rounded_percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let doubled_whole = whole.saturating_mul(2);
    let rounded = part.saturating_mul(200).saturating_add(whole) / doubled_whole;
    rounded.min(100) as u8
}

/// Stateless decision logic over attendance and meal logs.
///
/// The engine only reads the logs it is handed. The serving windows are
/// fixed at construction and the current time is always an argument.
#[derive(Debug, Clone, Default)]
pub struct EligibilityEngine {
    windows: MealWindows,
}

impl EligibilityEngine {
    /// Create a new engine with the given serving windows
    pub fn new(windows: MealWindows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &MealWindows {
        &self.windows
    }

    /// Decide whether `student_id` may receive `meal_type` on `date`.
    ///
    /// Checks run in a fixed order and the first hit wins:
    /// 1. no `present` attendance on `date`
    /// 2. this meal type already handed out on `date`
    /// 3. `now` outside the serving window
    /// 4. check-in after the window's arrival cutoff
    pub fn evaluate(
        &self,
        student_id: &str,
        meal_type: MealType,
        attendance: &[AttendanceRecord],
        meals: &[MealRecord],
        date: NaiveDate,
        now: NaiveTime,
    ) -> ValidationResult {
        let result = self.decide(student_id, meal_type, attendance, meals, date, now);
        tracing::debug!(
            "Evaluated {} for {} on {} at {}: {}",
            meal_type,
            student_id,
            date,
            now.format(hhmm::FORMAT),
            result.code()
        );
        result
    }

    fn decide(
        &self,
        student_id: &str,
        meal_type: MealType,
        attendance: &[AttendanceRecord],
        meals: &[MealRecord],
        date: NaiveDate,
        now: NaiveTime,
    ) -> ValidationResult {
        let Some(record) = attendance
            .iter()
            .find(|r| r.student_id == student_id && r.is_present_on(date))
        else {
            return ValidationResult::NoAttendance;
        };

        if let Some(meal) = meals
            .iter()
            .find(|m| m.student_id == student_id && m.date == date && m.meal_type == meal_type)
        {
            return ValidationResult::AlreadyReceived {
                attendance: record.clone(),
                meal: meal.clone(),
            };
        }

        let window = self.windows.get(meal_type);
        if !window.contains(now) {
            return ValidationResult::TimeRestriction {
                attendance: record.clone(),
                meal_type,
                start: window.start(),
                end: window.end(),
            };
        }

        if let Some(cutoff) = window.arrival_cutoff() {
            if window.is_late_arrival(record.time) {
                return ValidationResult::LateAttendance {
                    attendance: record.clone(),
                    meal_type,
                    cutoff,
                };
            }
        }

        ValidationResult::Eligible {
            attendance: record.clone(),
        }
    }

    /// Present students on `date` who may receive `meal_type` at `now`,
    /// in attendance log order.
    pub fn eligible_students<'a>(
        &self,
        meal_type: MealType,
        attendance: &'a [AttendanceRecord],
        meals: &[MealRecord],
        date: NaiveDate,
        now: NaiveTime,
    ) -> Vec<&'a AttendanceRecord> {
        attendance
            .iter()
            .filter(|r| r.is_present_on(date))
            .filter(|r| {
                self.decide(&r.student_id, meal_type, attendance, meals, date, now)
                    .is_eligible()
            })
            .collect()
    }

    /// Per-meal-type distribution figures for `date`.
    pub fn statistics(
        &self,
        attendance: &[AttendanceRecord],
        meals: &[MealRecord],
        date: NaiveDate,
        now: NaiveTime,
    ) -> DistributionStats {
        let total_present = attendance.iter().filter(|r| r.is_present_on(date)).count();
        let todays_meals: Vec<&MealRecord> = meals.iter().filter(|m| m.date == date).collect();

        let by_meal = MealType::ALL
            .iter()
            .map(|&meal_type| {
                let distributed = todays_meals
                    .iter()
                    .filter(|m| m.meal_type == meal_type)
                    .count();
                let eligible = self
                    .eligible_students(meal_type, attendance, meals, date, now)
                    .len();

                if eligible > 0 && distributed > eligible {
                    tracing::warn!(
                        "{} distributed ({}) exceeds eligible ({}) on {}; rate capped at 100",
                        meal_type,
                        distributed,
                        eligible,
                        date
                    );
                }

                MealTypeStats {
                    meal_type,
                    present: total_present,
                    distributed,
                    eligible,
                    distribution_rate: rounded_percentage(distributed, eligible),
                }
            })
            .collect();

        DistributionStats {
            date,
            total_present,
            total_meals_distributed: todays_meals.len(),
            by_meal,
        }
    }

    /// Status of every meal type for one student on `date`.
    pub fn student_status(
        &self,
        student_id: &str,
        attendance: &[AttendanceRecord],
        meals: &[MealRecord],
        date: NaiveDate,
        now: NaiveTime,
    ) -> Vec<MealStatus> {
        MealType::ALL
            .iter()
            .map(|&meal_type| {
                let result = self.evaluate(student_id, meal_type, attendance, meals, date, now);
                MealStatus {
                    meal_type,
                    is_eligible: result.is_eligible(),
                    status: result.code(),
                    reason: result.reason(),
                    received: result.meal().is_some(),
                    received_at: result.meal().map(|m| m.time),
                }
            })
            .collect()
    }

    /// Append an audit entry for a distribution authorised by `result`.
    ///
    /// Callers must only pass an `Eligible` result for the same student and
    /// meal type; nothing is re-validated here.
    pub fn record_distribution_audit<L: AuditLog + ?Sized>(
        &self,
        log: &mut L,
        student_id: &str,
        meal_type: MealType,
        distributed_by: &str,
        result: &ValidationResult,
        now: DateTime<FixedOffset>,
    ) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::new(student_id, meal_type, distributed_by, result, now);
        log.append(&entry)?;
        tracing::info!(
            "Recorded {} distribution to {} by {} ({})",
            meal_type,
            student_id,
            distributed_by,
            entry.validation_code
        );
        Ok(entry)
    }
}
