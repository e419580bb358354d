//! Meal distribution desk.
//!
//! Ties the record store, the eligibility engine and the audit log together
//! the way a serving counter uses them: look a student up, re-check
//! eligibility at the moment of hand-out, then record the meal and its audit
//! entry. The meal is stored first, so an audit entry always refers to a
//! meal that was persisted.
//!
//! Student ids are trimmed at this boundary for every operation, matching
//! how check-in stores them.
//!
//! The read-decide-write sequence is not atomic. `MealDesk` takes `&mut self`
//! for writes, so within one process a single desk serialises them; separate
//! processes sharing the same files do not.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use thiserror::Error;

use crate::audit::{AuditEntry, AuditError, AuditLog};
use crate::eligibility::{
    truncate_to_minute, AttendanceRecord, EligibilityEngine, MealRecord, MealType, ValidationCode,
    ValidationReport, ValidationResult,
};
use crate::metrics::AppMetrics;
use crate::store::{RecordStore, StoreError};

/// Errors from a distribution attempt
#[derive(Error, Debug)]
pub enum DistributionError {
    #[error("Cannot distribute meal: {reason}")]
    NotEligible { code: ValidationCode, reason: String },

    #[error("Distributing staff member must be named")]
    MissingStaff,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Result of looking a student up at the counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// No attendance under this id on any date.
    NotFound,
    Evaluated(ValidationResult),
}

impl SearchOutcome {
    pub fn code(&self) -> ValidationCode {
        match self {
            SearchOutcome::NotFound => ValidationCode::NotFound,
            SearchOutcome::Evaluated(result) => result.code(),
        }
    }

    pub fn report(&self) -> ValidationReport {
        match self {
            SearchOutcome::NotFound => ValidationReport {
                is_eligible: false,
                reason: "No attendance has ever been recorded for this student".to_string(),
                validation_code: ValidationCode::NotFound,
                student_info: None,
                meal_info: None,
            },
            SearchOutcome::Evaluated(result) => ValidationReport::from(result),
        }
    }
}

/// A completed hand-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub meal: MealRecord,
    pub audit: AuditEntry,
}

/// Serving counter over one record store and one audit log.
pub struct MealDesk<L: AuditLog> {
    engine: EligibilityEngine,
    store: RecordStore,
    audit: L,
    metrics: Arc<AppMetrics>,
}

impl<L: AuditLog> MealDesk<L> {
    pub fn new(
        engine: EligibilityEngine,
        store: RecordStore,
        audit: L,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            engine,
            store,
            audit,
            metrics,
        }
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn audit(&self) -> &L {
        &self.audit
    }

    /// Look a student up for `meal_type`.
    ///
    /// Unknown ids (no attendance on any date) are reported as `NotFound`
    /// instead of `NoAttendance`.
    pub fn search(
        &self,
        student_id: &str,
        meal_type: MealType,
        date: NaiveDate,
        now: NaiveTime,
    ) -> SearchOutcome {
        let student_id = student_id.trim();
        let outcome = if self.store.knows_student(student_id) {
            SearchOutcome::Evaluated(self.engine.evaluate(
                student_id,
                meal_type,
                self.store.attendance(),
                self.store.meals(),
                date,
                now,
            ))
        } else {
            tracing::debug!("{} has no attendance history", student_id);
            SearchOutcome::NotFound
        };

        self.metrics.observe_evaluation(outcome.code());
        outcome
    }

    /// Mark a student present at `now`.
    pub fn check_in(
        &mut self,
        student_id: &str,
        student_name: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<AttendanceRecord, StoreError> {
        let record = self
            .store
            .check_in(student_id, student_name, now.date_naive(), now.time())?
            .clone();
        self.metrics.check_ins_total.inc();
        Ok(record)
    }

    /// Hand `meal_type` to `student_id` at `now`.
    ///
    /// Eligibility is evaluated again right before anything is written. On
    /// success the meal record is stored first, then the audit entry is
    /// appended. If storing the meal fails nothing is audited.
    pub fn distribute(
        &mut self,
        student_id: &str,
        meal_type: MealType,
        distributed_by: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<Distribution, DistributionError> {
        let student_id = student_id.trim();
        let distributed_by = distributed_by.trim();
        if distributed_by.is_empty() {
            return Err(DistributionError::MissingStaff);
        }

        let date = now.date_naive();
        let result = self.engine.evaluate(
            student_id,
            meal_type,
            self.store.attendance(),
            self.store.meals(),
            date,
            now.time(),
        );
        self.metrics.observe_evaluation(result.code());

        let ValidationResult::Eligible { attendance } = &result else {
            self.metrics.observe_rejection(result.code());
            tracing::warn!(
                "Refused {} for {}: {}",
                meal_type,
                student_id,
                result.code()
            );
            return Err(DistributionError::NotEligible {
                code: result.code(),
                reason: result.reason(),
            });
        };

        let meal = MealRecord {
            student_id: attendance.student_id.clone(),
            student_name: attendance.student_name.clone(),
            date,
            time: truncate_to_minute(now.time()),
            meal_type,
            distributed_by: distributed_by.to_string(),
        };

        self.store.append_meal(meal.clone())?;
        let audit = self.engine.record_distribution_audit(
            &mut self.audit,
            student_id,
            meal_type,
            distributed_by,
            &result,
            now,
        )?;
        self.metrics.observe_distribution(meal_type);

        Ok(Distribution { meal, audit })
    }

    /// Give back the record store, e.g. to persist it.
    pub fn into_store(self) -> RecordStore {
        self.store
    }
}
