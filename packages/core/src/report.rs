//! Daily attendance and meal report.
//!
//! A [`DailyReport`] is the snapshot an administrator downloads at the end
//! of the day: the raw records for the date, the engine's distribution
//! statistics, a headline summary with its alerts and a seven-day
//! attendance trend. A [`StudentSummary`] is the per-student view of one
//! calendar month.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eligibility::{
    engine::rounded_percentage,
    types::{
        minutes_since_midnight, AttendanceRecord, AttendanceStatus, DistributionStats, MealRecord,
        MealType,
    },
    EligibilityEngine,
};

/// Number of days covered by the attendance trend, report date included.
pub const TREND_DAYS: u64 = 7;

/// Attendance rates below this raise a low-attendance alert.
pub const LOW_ATTENDANCE_RATE: u8 = 75;

/// Attendance rates at or above this are flagged as excellent.
pub const EXCELLENT_ATTENDANCE_RATE: u8 = 90;

/// More late arrivals than this raise an alert.
pub const LATE_ARRIVALS_ALERT: usize = 10;

/// Check-ins strictly after this time count as late arrivals.
pub fn late_arrival_threshold() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Errors from writing a report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Meals handed out on the report date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealsByType {
    pub breakfast: usize,
    pub lunch: usize,
    pub snack: usize,
    pub total: usize,
}

/// Headline figures for the report date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub total_students: usize,
    pub present_today: usize,
    pub absent_today: usize,
    pub attendance_rate: u8,
    pub late_arrivals: usize,
    pub meals_distributed: MealsByType,
    pub alerts: Vec<ReportAlert>,
}

/// Point of attention raised by a [`DailySummary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReportAlert {
    LowAttendance { rate: u8 },
    HighLateArrivals { count: usize },
    /// Present students who have not received any meal yet.
    PendingMeals { count: usize },
    ExcellentAttendance { rate: u8 },
}

impl ReportAlert {
    /// Alerts for a summary, in display order.
    pub fn for_summary(summary: &DailySummary) -> Vec<ReportAlert> {
        let mut alerts = Vec::new();
        if summary.attendance_rate < LOW_ATTENDANCE_RATE {
            alerts.push(ReportAlert::LowAttendance {
                rate: summary.attendance_rate,
            });
        }
        if summary.late_arrivals > LATE_ARRIVALS_ALERT {
            alerts.push(ReportAlert::HighLateArrivals {
                count: summary.late_arrivals,
            });
        }
        if summary.meals_distributed.total < summary.present_today {
            alerts.push(ReportAlert::PendingMeals {
                count: summary.present_today - summary.meals_distributed.total,
            });
        }
        if summary.attendance_rate >= EXCELLENT_ATTENDANCE_RATE {
            alerts.push(ReportAlert::ExcellentAttendance {
                rate: summary.attendance_rate,
            });
        }
        alerts
    }

    pub fn message(&self) -> String {
        match self {
            ReportAlert::LowAttendance { rate } => {
                format!("Low attendance: {}% is below {}%", rate, LOW_ATTENDANCE_RATE)
            }
            ReportAlert::HighLateArrivals { count } => {
                format!("High late arrivals: {} students arrived late", count)
            }
            ReportAlert::PendingMeals { count } => {
                format!("Pending meals: {} students haven't received meals", count)
            }
            ReportAlert::ExcellentAttendance { rate } => {
                format!("Excellent attendance: {}%", rate)
            }
        }
    }
}

/// Attendance for one day of the trend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTrend {
    pub date: NaiveDate,
    pub present: usize,
    pub absent: usize,
    pub attendance_rate: u8,
}

/// Downloadable snapshot of one school day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: NaiveDate,
    pub attendance: Vec<AttendanceRecord>,
    pub meals: Vec<MealRecord>,
    pub stats: DistributionStats,
    pub summary: DailySummary,
    pub weekly_trend: Vec<DayTrend>,
}

fn count_present(attendance: &[AttendanceRecord], date: NaiveDate) -> usize {
    attendance.iter().filter(|r| r.is_present_on(date)).count()
}

impl DailyReport {
    /// Assemble the report for `date`, with eligibility figures as of `now`.
    pub fn build(
        engine: &EligibilityEngine,
        attendance: &[AttendanceRecord],
        meals: &[MealRecord],
        date: NaiveDate,
        now: NaiveTime,
        total_students: usize,
    ) -> Self {
        let day_attendance: Vec<AttendanceRecord> =
            attendance.iter().filter(|r| r.date == date).cloned().collect();
        let day_meals: Vec<MealRecord> = meals.iter().filter(|m| m.date == date).cloned().collect();

        let present_today = count_present(attendance, date);
        let threshold = minutes_since_midnight(late_arrival_threshold());
        let late_arrivals = day_attendance
            .iter()
            .filter(|r| r.is_present_on(date) && minutes_since_midnight(r.time) > threshold)
            .count();

        let served = |meal_type: MealType| day_meals.iter().filter(|m| m.meal_type == meal_type).count();
        let mut summary = DailySummary {
            total_students,
            present_today,
            absent_today: total_students.saturating_sub(present_today),
            attendance_rate: rounded_percentage(present_today, total_students),
            late_arrivals,
            meals_distributed: MealsByType {
                breakfast: served(MealType::Breakfast),
                lunch: served(MealType::Lunch),
                snack: served(MealType::Snack),
                total: day_meals.len(),
            },
            alerts: Vec::new(),
        };
        summary.alerts = ReportAlert::for_summary(&summary);

        let weekly_trend = (0..TREND_DAYS)
            .rev()
            .filter_map(|offset| date.checked_sub_days(Days::new(offset)))
            .map(|day| {
                let present = count_present(attendance, day);
                DayTrend {
                    date: day,
                    present,
                    absent: total_students.saturating_sub(present),
                    attendance_rate: rounded_percentage(present, total_students),
                }
            })
            .collect();

        Self {
            date,
            attendance: day_attendance,
            meals: day_meals,
            stats: engine.statistics(attendance, meals, date, now),
            summary,
            weekly_trend,
        }
    }

    /// File name used for the exported report.
    pub fn file_name(date: NaiveDate) -> String {
        format!("edutrak-report-{}.json", date)
    }

    /// Write the report as pretty JSON into `dir`, returning the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ReportError> {
        let path = dir.join(Self::file_name(self.date));
        let body = serde_json::to_string_pretty(self)?;

        fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        fs::write(&path, body).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Report for {} written to {}", self.date, path.display());
        Ok(path)
    }
}

/// One student's attendance over a calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub student_name: Option<String>,
    /// First day of the summarised month.
    pub month: NaiveDate,
    /// Days of the month up to and including today.
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub attendance_percentage: u8,
    /// One meal entitlement per present day.
    pub meals_eligible: usize,
    /// Present days counted back from the latest record until the first
    /// non-present one.
    pub current_streak: usize,
}

impl StudentSummary {
    /// Summarise `student_id` for the month containing `month`, counting
    /// only days up to `today`.
    pub fn build(
        student_id: &str,
        attendance: &[AttendanceRecord],
        month: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        let student_id = student_id.trim();
        let month_start = month.with_day(1).unwrap_or(month);
        let month_end = month_start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(month_start);
        let last_day = month_end.min(today);
        let total_days = if last_day < month_start {
            0
        } else {
            (last_day - month_start).num_days() as usize + 1
        };

        let mut records: Vec<&AttendanceRecord> = attendance
            .iter()
            .filter(|r| r.student_id == student_id && r.date >= month_start && r.date <= last_day)
            .collect();

        let present_days = records
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .len();

        // Newest first; records of the same day keep log order.
        records.sort_by(|a, b| b.date.cmp(&a.date));
        let current_streak = records
            .iter()
            .take_while(|r| r.status == AttendanceStatus::Present)
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .len();

        let student_name = attendance
            .iter()
            .find(|r| r.student_id == student_id)
            .map(|r| r.student_name.clone());

        Self {
            student_id: student_id.to_string(),
            student_name,
            month: month_start,
            total_days,
            present_days,
            absent_days: total_days.saturating_sub(present_days),
            attendance_percentage: rounded_percentage(present_days, total_days),
            meals_eligible: present_days,
            current_streak,
        }
    }
}
