//! End-to-end tests for the meal distribution flow.
//!
//! Each test works on a fresh temporary directory holding the attendance
//! log, the meal log, the JSON-lines audit log and the report output, the
//! same files the CLI reads and writes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use clap::Parser;
use serde_json::Value;

use edutrak::{
    audit::{AuditLog, JsonlAuditLog},
    cli::Cli,
    commands,
    config::Config,
    distribution::{DistributionError, MealDesk},
    eligibility::{EligibilityEngine, MealType, ValidationCode},
    metrics::AppMetrics,
    report::{DailyReport, StudentSummary},
    store::RecordStore,
};

// ---- Helpers ----------------------------------------------------------------

struct Files {
    _dir: tempfile::TempDir,
    attendance: PathBuf,
    meals: PathBuf,
    audit: PathBuf,
    reports: PathBuf,
}

fn files() -> Files {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    Files {
        attendance: root.join("attendance.json"),
        meals: root.join("meals.json"),
        audit: root.join("audit.jsonl"),
        reports: root.join("reports"),
        _dir: dir,
    }
}

fn ist(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(19_800)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 15, hour, minute, 0)
        .unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

fn open_desk(files: &Files) -> MealDesk<JsonlAuditLog> {
    MealDesk::new(
        EligibilityEngine::default(),
        RecordStore::load(&files.attendance, &files.meals).unwrap(),
        JsonlAuditLog::new(&files.audit),
        Arc::new(AppMetrics::new().unwrap()),
    )
}

fn config_for(files: &Files) -> Config {
    let attendance = files.attendance.display().to_string();
    let meals = files.meals.display().to_string();
    let audit = files.audit.display().to_string();
    let reports = files.reports.display().to_string();
    Config::from_lookup(move |key| match key {
        "EDUTRAK_ATTENDANCE_FILE" => Some(attendance.clone()),
        "EDUTRAK_MEALS_FILE" => Some(meals.clone()),
        "EDUTRAK_AUDIT_LOG" => Some(audit.clone()),
        "EDUTRAK_REPORT_DIR" => Some(reports.clone()),
        "EDUTRAK_TOTAL_STUDENTS" => Some("4".to_string()),
        _ => None,
    })
    .unwrap()
}

fn run_cli(files: &Files, args: &[&str]) {
    let mut argv = vec!["edutrak", "--json", "--date", "2024-01-15"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    commands::run(cli, config_for(files)).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ---- Library flow -----------------------------------------------------------

#[test]
fn full_day_persists_across_reloads() {
    let files = files();

    let mut desk = open_desk(&files);
    desk.check_in("STU001", "Asha", ist(8, 10)).unwrap();
    desk.check_in("STU002", "Ravi", ist(9, 40)).unwrap();
    desk.distribute("STU001", MealType::Breakfast, "cook-1", ist(8, 30))
        .unwrap();

    // A fresh desk sees everything the first one wrote.
    let mut desk = open_desk(&files);
    assert_eq!(desk.store().attendance().len(), 2);
    assert_eq!(desk.store().meals().len(), 1);
    assert_eq!(desk.audit().entries().unwrap().len(), 1);

    let err = desk
        .distribute("STU001", MealType::Breakfast, "cook-2", ist(8, 45))
        .unwrap_err();
    assert!(matches!(
        err,
        DistributionError::NotEligible { code: ValidationCode::AlreadyReceived, .. }
    ));

    let err = desk
        .distribute("STU002", MealType::Breakfast, "cook-1", ist(9, 45))
        .unwrap_err();
    assert!(matches!(
        err,
        DistributionError::NotEligible { code: ValidationCode::LateAttendance, .. }
    ));

    // Late for breakfast does not matter at lunch.
    desk.distribute("STU002", MealType::Lunch, "cook-1", ist(12, 0))
        .unwrap();

    let audit = JsonlAuditLog::new(&files.audit).entries().unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[1].student_id, "STU002");
    assert_eq!(audit[1].meal_type, MealType::Lunch);
    assert_eq!(audit[1].validation_code, ValidationCode::Eligible);
}

#[test]
fn search_distinguishes_unknown_from_absent_today() {
    let files = files();
    let mut desk = open_desk(&files);
    desk.check_in("STU001", "Asha", ist(8, 0) - chrono::Duration::days(1))
        .unwrap();

    let now = ist(8, 0).time();
    assert_eq!(
        desk.search("STU404", MealType::Breakfast, day(), now).code(),
        ValidationCode::NotFound
    );
    assert_eq!(
        desk.search("STU001", MealType::Breakfast, day(), now).code(),
        ValidationCode::NoAttendance
    );
}

#[test]
fn report_snapshot_reflects_the_day() {
    let files = files();
    let mut desk = open_desk(&files);
    desk.check_in("STU001", "Asha", ist(8, 10)).unwrap();
    desk.check_in("STU002", "Ravi", ist(9, 20)).unwrap();
    desk.distribute("STU001", MealType::Breakfast, "cook-1", ist(8, 30))
        .unwrap();

    let store = desk.store();
    let report = DailyReport::build(
        desk.engine(),
        store.attendance(),
        store.meals(),
        day(),
        ist(8, 45).time(),
        4,
    );
    let path = report.write_to(&files.reports).unwrap();

    let json = read_json(&path);
    assert_eq!(json["date"], "2024-01-15");
    assert_eq!(json["summary"]["presentToday"], 2);
    assert_eq!(json["summary"]["lateArrivals"], 1);
    assert_eq!(json["summary"]["attendanceRate"], 50);
    assert_eq!(json["meals"].as_array().unwrap().len(), 1);
    assert_eq!(json["weeklyTrend"].as_array().unwrap().len(), 7);

    let breakfast = report.stats.for_meal(MealType::Breakfast).unwrap();
    assert_eq!(breakfast.distributed, 1);
    assert_eq!(breakfast.eligible, 1);
    assert_eq!(breakfast.distribution_rate, 100);
}

// ---- CLI commands -----------------------------------------------------------

#[test]
fn cli_check_in_and_distribute_write_files() {
    let files = files();

    run_cli(&files, &["--at", "08:05", "check-in", "STU001", "--name", "Asha"]);
    run_cli(
        &files,
        &["--at", "08:20", "distribute", "STU001", "--meal", "breakfast", "--staff", "cook-1"],
    );

    let attendance = read_json(&files.attendance);
    assert_eq!(attendance[0]["studentId"], "STU001");
    assert_eq!(attendance[0]["time"], "08:05");
    assert_eq!(attendance[0]["status"], "present");

    let meals = read_json(&files.meals);
    assert_eq!(meals[0]["mealType"], "breakfast");
    assert_eq!(meals[0]["time"], "08:20");
    assert_eq!(meals[0]["distributedBy"], "cook-1");

    let audit = JsonlAuditLog::new(&files.audit).entries().unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].attendance_time.unwrap().format("%H:%M").to_string(), "08:05");
}

#[test]
fn cli_refused_distribution_leaves_files_untouched() {
    let files = files();
    run_cli(&files, &["--at", "08:05", "check-in", "STU001", "--name", "Asha"]);

    let cli = Cli::try_parse_from([
        "edutrak", "--date", "2024-01-15", "--at", "10:30", "distribute", "STU001", "--meal",
        "breakfast", "--staff", "cook-1",
    ])
    .unwrap();
    let err = commands::run(cli, config_for(&files)).unwrap_err();

    assert!(err.to_string().contains("only allowed between 07:00 and 10:00"));
    assert!(!files.meals.exists() || read_json(&files.meals).as_array().unwrap().is_empty());
    assert!(!files.audit.exists());
}

#[test]
fn cli_distribution_is_not_audited_when_meal_log_cannot_be_written() {
    let mut files = files();
    let blocker = files.attendance.with_file_name("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    files.meals = blocker.join("meals.json");

    run_cli(&files, &["--at", "08:05", "check-in", "STU001", "--name", "Asha"]);
    for at in ["08:20", "08:25"] {
        let cli = Cli::try_parse_from([
            "edutrak", "--date", "2024-01-15", "--at", at, "distribute", "STU001", "--meal",
            "breakfast", "--staff", "cook-1",
        ])
        .unwrap();
        assert!(commands::run(cli, config_for(&files)).is_err());
    }

    assert!(JsonlAuditLog::new(&files.audit).entries().unwrap().is_empty());
}

#[test]
fn cli_report_and_read_only_commands_succeed() {
    let files = files();
    run_cli(&files, &["--at", "11:40", "check-in", "STU001", "--name", "Asha"]);

    run_cli(&files, &["--at", "12:00", "check", "STU001", "--meal", "lunch"]);
    run_cli(&files, &["--at", "12:00", "eligible", "--meal", "lunch"]);
    run_cli(&files, &["--at", "12:00", "stats", "--metrics"]);
    run_cli(&files, &["--at", "12:00", "status", "STU001"]);
    run_cli(&files, &["--at", "12:00", "audit"]);
    run_cli(&files, &["--at", "12:00", "report"]);
    run_cli(&files, &["--at", "12:00", "summary", "STU001", "--month", "2024-01"]);

    let report = read_json(&files.reports.join("edutrak-report-2024-01-15.json"));
    assert_eq!(report["summary"]["totalStudents"], 4);
    assert_eq!(report["summary"]["presentToday"], 1);
    assert_eq!(report["summary"]["alerts"][0]["kind"], "lowAttendance");
    assert_eq!(report["summary"]["alerts"][1]["kind"], "pendingMeals");
}

#[test]
fn student_summary_over_checked_in_days() {
    let files = files();
    let mut desk = open_desk(&files);
    for day_offset in 0..3 {
        desk.check_in("STU001", "Asha", ist(8, 0) - chrono::Duration::days(day_offset))
            .unwrap();
    }

    let summary = StudentSummary::build("STU001", desk.store().attendance(), day(), day());
    assert_eq!(summary.total_days, 15);
    assert_eq!(summary.present_days, 3);
    assert_eq!(summary.current_streak, 3);
    assert_eq!(summary.attendance_percentage, 20);
}
