//! CLI command dispatch.
//!
//! Resolves paths and the evaluation moment, loads the record logs, runs one
//! command against a [`MealDesk`] and prints the result as text or JSON.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::audit::{AuditLog, JsonlAuditLog};
use crate::cli::{Cli, Command};
use crate::clock::InstitutionClock;
use crate::config::Config;
use crate::distribution::MealDesk;
use crate::eligibility::{hhmm, EligibilityEngine};
use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::report::{DailyReport, StudentSummary};
use crate::store::RecordStore;

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", human());
    }
    Ok(())
}

/// Run one CLI command to completion.
pub fn run(cli: Cli, config: Config) -> Result<(), AppError> {
    let attendance_path: PathBuf = cli.attendance.unwrap_or(config.attendance_file);
    let meals_path: PathBuf = cli.meals.unwrap_or(config.meals_file);
    let audit_path: PathBuf = cli.audit_log.unwrap_or(config.audit_log);

    let clock = InstitutionClock::new(config.utc_offset);
    let moment = clock
        .resolve(cli.date, cli.at)
        .ok_or_else(|| AppError::Input("date and time do not form a valid local moment".to_string()))?;
    let date = moment.date_naive();
    let now = moment.time();

    let metrics = Arc::new(AppMetrics::new()?);
    let store = RecordStore::load(&attendance_path, &meals_path)?;
    let mut desk = MealDesk::new(
        EligibilityEngine::new(config.meal_windows),
        store,
        JsonlAuditLog::new(audit_path),
        Arc::clone(&metrics),
    );

    tracing::debug!("Running {:?} for {} at {}", cli.command, date, now.format(hhmm::FORMAT));

    match cli.command {
        Command::Check { student_id, meal } => {
            let report = desk.search(&student_id, meal, date, now).report();
            emit(cli.json, &report, || {
                format!("{} {}: {} ({})", student_id, meal, report.validation_code, report.reason)
            })?;
        }

        Command::Eligible { meal } => {
            let store = desk.store();
            let eligible = desk
                .engine()
                .eligible_students(meal, store.attendance(), store.meals(), date, now);
            emit(cli.json, &eligible, || {
                let mut lines = vec![format!("{} eligible for {} on {}", eligible.len(), meal, date)];
                lines.extend(eligible.iter().map(|r| {
                    format!("  {}  {}  checked in {}", r.student_id, r.student_name, r.time.format(hhmm::FORMAT))
                }));
                lines.join("\n")
            })?;
        }

        Command::Stats => {
            let store = desk.store();
            let stats = desk
                .engine()
                .statistics(store.attendance(), store.meals(), date, now);
            emit(cli.json, &stats, || {
                let mut lines = vec![format!(
                    "{}: {} present, {} meals distributed",
                    stats.date, stats.total_present, stats.total_meals_distributed
                )];
                lines.extend(stats.by_meal.iter().map(|s| {
                    format!(
                        "  {:<9} distributed {:>4}  eligible {:>4}  rate {:>3}%",
                        s.meal_type.as_str(),
                        s.distributed,
                        s.eligible,
                        s.distribution_rate
                    )
                }));
                lines.join("\n")
            })?;
        }

        Command::Status { student_id } => {
            let store = desk.store();
            let status = desk
                .engine()
                .student_status(&student_id, store.attendance(), store.meals(), date, now);
            emit(cli.json, &status, || {
                status
                    .iter()
                    .map(|s| match s.received_at {
                        Some(at) => format!("{:<9} {} at {}", s.meal_type.as_str(), s.status, at.format(hhmm::FORMAT)),
                        None => format!("{:<9} {} ({})", s.meal_type.as_str(), s.status, s.reason),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        Command::CheckIn { student_id, name } => {
            let record = desk.check_in(&student_id, &name, moment)?;
            emit(cli.json, &record, || {
                format!(
                    "{} ({}) marked present on {} at {}",
                    record.student_name,
                    record.student_id,
                    record.date,
                    record.time.format(hhmm::FORMAT)
                )
            })?;
        }

        Command::Distribute { student_id, meal, staff } => {
            let distribution = desk.distribute(&student_id, meal, &staff, moment)?;
            emit(cli.json, &distribution.meal, || {
                format!(
                    "{} distributed to {} by {} at {}",
                    meal,
                    distribution.meal.student_name,
                    distribution.meal.distributed_by,
                    distribution.meal.time.format(hhmm::FORMAT)
                )
            })?;
        }

        Command::Report { out_dir } => {
            let store = desk.store();
            let report = DailyReport::build(
                desk.engine(),
                store.attendance(),
                store.meals(),
                date,
                now,
                config.total_students,
            );
            let path = report.write_to(&out_dir.unwrap_or(config.report_dir))?;
            emit(cli.json, &report, || {
                let mut lines = vec![format!("Report written to {}", path.display())];
                lines.extend(report.summary.alerts.iter().map(|a| format!("  {}", a.message())));
                lines.join("\n")
            })?;
        }

        Command::Audit => {
            let entries: Vec<_> = desk
                .audit()
                .entries()?
                .into_iter()
                .filter(|e| e.timestamp.with_timezone(&clock.offset()).date_naive() == date)
                .collect();
            emit(cli.json, &entries, || {
                entries
                    .iter()
                    .map(|e| {
                        format!(
                            "{}  {:<9} {}  by {}  ({})",
                            e.distribution_time.format(hhmm::FORMAT),
                            e.meal_type.as_str(),
                            e.student_id,
                            e.distributed_by,
                            e.validation_code
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }

        Command::Summary { student_id, month } => {
            let summary = StudentSummary::build(
                &student_id,
                desk.store().attendance(),
                month.unwrap_or(date),
                date,
            );
            emit(cli.json, &summary, || {
                format!(
                    "{} {}: {}/{} days present ({}%), {} absent, {} meals eligible, streak {}",
                    summary.student_id,
                    summary.month.format("%Y-%m"),
                    summary.present_days,
                    summary.total_days,
                    summary.attendance_percentage,
                    summary.absent_days,
                    summary.meals_eligible,
                    summary.current_streak
                )
            })?;
        }
    }

    if cli.metrics {
        print!("{}", metrics.render()?);
    }

    Ok(())
}
