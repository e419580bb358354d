use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};

use crate::eligibility::{parse_hhmm, MealType};

fn parse_time_arg(raw: &str) -> Result<NaiveTime, String> {
    parse_hhmm(raw).map_err(|e| e.to_string())
}

/// `YYYY-MM` to the first day of that month.
fn parse_month_arg(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| format!("Invalid month: {} (expected YYYY-MM)", raw))
}

/// EduTrak CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "edutrak",
    version,
    about = "Attendance-gated school meal eligibility"
)]
pub struct Cli {
    /// Attendance log (JSON array), overrides EDUTRAK_ATTENDANCE_FILE
    #[arg(long, global = true)]
    pub attendance: Option<PathBuf>,

    /// Meal log (JSON array), overrides EDUTRAK_MEALS_FILE
    #[arg(long, global = true)]
    pub meals: Option<PathBuf>,

    /// Audit log (JSON lines), overrides EDUTRAK_AUDIT_LOG
    #[arg(long, global = true)]
    pub audit_log: Option<PathBuf>,

    /// Date to evaluate (YYYY-MM-DD), defaults to today
    #[arg(long, global = true)]
    pub date: Option<NaiveDate>,

    /// Local time to evaluate at (HH:MM), defaults to now
    #[arg(long, global = true, value_parser = parse_time_arg)]
    pub at: Option<NaiveTime>,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether a student may receive a meal
    Check {
        student_id: String,
        #[arg(long, value_enum)]
        meal: MealType,
    },
    /// List present students who may still receive a meal
    Eligible {
        #[arg(long, value_enum)]
        meal: MealType,
    },
    /// Show distribution statistics for the day
    Stats,
    /// Show every meal's status for one student
    Status { student_id: String },
    /// Mark a student present
    CheckIn {
        student_id: String,
        #[arg(long)]
        name: String,
    },
    /// Hand a meal to a student and record it
    Distribute {
        student_id: String,
        #[arg(long, value_enum)]
        meal: MealType,
        #[arg(long)]
        staff: String,
    },
    /// Export the daily report as JSON
    Report {
        /// Output directory, overrides EDUTRAK_REPORT_DIR
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Show audit entries for the day
    Audit,
    /// Summarise one student's attendance for a month
    Summary {
        student_id: String,
        /// Month to summarise (YYYY-MM), defaults to the month of --date
        #[arg(long, value_parser = parse_month_arg)]
        month: Option<NaiveDate>,
    },
}
