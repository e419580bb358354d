//! Append-only attendance and meal record logs.
//!
//! `RecordStore` owns the two logs the eligibility engine reads. Records are
//! only ever appended: check-ins through [`RecordStore::check_in`], meal
//! hand-outs through [`RecordStore::append_meal`]. Both logs persist as
//! pretty-printed JSON arrays, the same shape the web client keeps in local
//! storage.
//!
//! A store opened with [`RecordStore::load`] is file-backed: every append is
//! written through before it returns, and an append whose write fails is
//! rolled back in memory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::eligibility::types::{
    hhmm, truncate_to_minute, AttendanceRecord, AttendanceStatus, MealRecord,
};

/// Errors from the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("Attendance already marked for {student_id} on {date}")]
    AlreadyCheckedIn { student_id: String, date: NaiveDate },

    #[error("Record file I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record file {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Files backing a loaded store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFiles {
    pub attendance: PathBuf,
    pub meals: PathBuf,
}

/// Attendance and meal logs, optionally written through to disk.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    attendance: Vec<AttendanceRecord>,
    meals: Vec<MealRecord>,
    files: Option<RecordFiles>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing logs, keeping their order.
    pub fn from_records(attendance: Vec<AttendanceRecord>, meals: Vec<MealRecord>) -> Self {
        Self {
            attendance,
            meals,
            files: None,
        }
    }

    /// Load both logs and keep writing appends back to them. A missing file
    /// is an empty log.
    pub fn load(attendance_path: &Path, meals_path: &Path) -> Result<Self, StoreError> {
        let attendance: Vec<AttendanceRecord> = read_log(attendance_path)?;
        let meals: Vec<MealRecord> = read_log(meals_path)?;

        tracing::debug!(
            "Loaded {} attendance and {} meal records",
            attendance.len(),
            meals.len()
        );

        Ok(Self {
            attendance,
            meals,
            files: Some(RecordFiles {
                attendance: attendance_path.to_path_buf(),
                meals: meals_path.to_path_buf(),
            }),
        })
    }

    /// Files appends are written to, if the store was loaded from disk.
    pub fn files(&self) -> Option<&RecordFiles> {
        self.files.as_ref()
    }

    /// Write both logs back to disk.
    pub fn save(&self, attendance_path: &Path, meals_path: &Path) -> Result<(), StoreError> {
        write_log(attendance_path, &self.attendance)?;
        write_log(meals_path, &self.meals)
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn meals(&self) -> &[MealRecord] {
        &self.meals
    }

    /// `true` when `student_id` has an attendance record on any date.
    pub fn knows_student(&self, student_id: &str) -> bool {
        self.attendance.iter().any(|r| r.student_id == student_id)
    }

    /// Mark `student_id` present on `date`.
    ///
    /// At most one record per student per day is accepted, whatever its
    /// status.
    pub fn check_in(
        &mut self,
        student_id: &str,
        student_name: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<&AttendanceRecord, StoreError> {
        let student_id = student_id.trim();
        let student_name = student_name.trim();

        if student_id.is_empty() {
            return Err(StoreError::EmptyField { field: "student id" });
        }
        if student_name.is_empty() {
            return Err(StoreError::EmptyField { field: "student name" });
        }
        if self
            .attendance
            .iter()
            .any(|r| r.student_id == student_id && r.date == date)
        {
            return Err(StoreError::AlreadyCheckedIn {
                student_id: student_id.to_string(),
                date,
            });
        }

        self.attendance.push(AttendanceRecord {
            student_id: student_id.to_string(),
            student_name: student_name.to_string(),
            date,
            time: truncate_to_minute(time),
            status: AttendanceStatus::Present,
        });
        if let Some(files) = &self.files {
            if let Err(err) = write_log(&files.attendance, &self.attendance) {
                self.attendance.pop();
                return Err(err);
            }
        }

        let record = &self.attendance[self.attendance.len() - 1];
        tracing::info!(
            "{} checked in on {} at {}",
            record.student_id,
            date,
            record.time.format(hhmm::FORMAT)
        );
        Ok(record)
    }

    /// Append a meal record. Duplicate checks belong to the caller.
    pub fn append_meal(&mut self, record: MealRecord) -> Result<(), StoreError> {
        self.meals.push(record);
        if let Some(files) = &self.files {
            if let Err(err) = write_log(&files.meals, &self.meals) {
                self.meals.pop();
                return Err(err);
            }
        }
        Ok(())
    }
}

fn read_log<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        tracing::debug!("{} does not exist yet, starting empty", path.display());
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_log<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let body = serde_json::to_string_pretty(records).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, body).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::types::{parse_hhmm, MealType};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn t(raw: &str) -> NaiveTime {
        parse_hhmm(raw).unwrap()
    }

    fn breakfast(id: &str) -> MealRecord {
        MealRecord {
            student_id: id.to_string(),
            student_name: "Ravi".to_string(),
            date: day(),
            time: t("08:30"),
            meal_type: MealType::Breakfast,
            distributed_by: "cook-1".to_string(),
        }
    }

    // ---- check_in ----

    #[test]
    fn check_in_appends_present_record() {
        let mut store = RecordStore::new();
        let record = store.check_in("STU001", "Asha", day(), t("08:45")).unwrap().clone();

        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.time, t("08:45"));
        assert_eq!(store.attendance(), &[record]);
    }

    #[test]
    fn check_in_trims_and_drops_seconds() {
        let mut store = RecordStore::new();
        let now = NaiveTime::from_hms_opt(8, 45, 59).unwrap();
        let record = store.check_in("  STU001 ", " Asha ", day(), now).unwrap();

        assert_eq!(record.student_id, "STU001");
        assert_eq!(record.student_name, "Asha");
        assert_eq!(record.time, t("08:45"));
    }

    #[test]
    fn check_in_rejects_second_record_same_day() {
        let mut store = RecordStore::new();
        store.check_in("STU001", "Asha", day(), t("08:45")).unwrap();
        let err = store.check_in("STU001", "Asha", day(), t("09:00")).unwrap_err();

        assert!(matches!(err, StoreError::AlreadyCheckedIn { .. }));
        assert_eq!(store.attendance().len(), 1);
    }

    #[test]
    fn check_in_allows_next_day() {
        let mut store = RecordStore::new();
        store.check_in("STU001", "Asha", day(), t("08:45")).unwrap();
        store
            .check_in("STU001", "Asha", day().succ_opt().unwrap(), t("08:40"))
            .unwrap();
        assert_eq!(store.attendance().len(), 2);
    }

    #[test]
    fn check_in_rejects_blank_fields() {
        let mut store = RecordStore::new();
        assert!(matches!(
            store.check_in(" ", "Asha", day(), t("08:00")),
            Err(StoreError::EmptyField { field: "student id" })
        ));
        assert!(matches!(
            store.check_in("STU001", "", day(), t("08:00")),
            Err(StoreError::EmptyField { field: "student name" })
        ));
        assert!(store.attendance().is_empty());
    }

    // ---- knows_student ----

    #[test]
    fn knows_student_looks_across_all_dates() {
        let mut store = RecordStore::new();
        store
            .check_in("STU001", "Asha", day().pred_opt().unwrap(), t("08:00"))
            .unwrap();
        assert!(store.knows_student("STU001"));
        assert!(!store.knows_student("STU002"));
    }

    // ---- load / save ----

    #[test]
    fn load_missing_files_gives_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::load(&dir.path().join("a.json"), &dir.path().join("m.json")).unwrap();
        assert!(store.attendance().is_empty());
        assert!(store.meals().is_empty());
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let attendance_path = dir.path().join("data").join("attendance.json");
        let meals_path = dir.path().join("data").join("meals.json");

        let mut store = RecordStore::new();
        store.check_in("STU002", "Ravi", day(), t("08:10")).unwrap();
        store.check_in("STU001", "Asha", day(), t("08:20")).unwrap();
        store.append_meal(breakfast("STU002")).unwrap();
        store.save(&attendance_path, &meals_path).unwrap();

        let loaded = RecordStore::load(&attendance_path, &meals_path).unwrap();
        assert_eq!(loaded.attendance(), store.attendance());
        assert_eq!(loaded.meals(), store.meals());
    }

    #[test]
    fn loaded_store_writes_appends_through() {
        let dir = tempfile::tempdir().unwrap();
        let attendance_path = dir.path().join("attendance.json");
        let meals_path = dir.path().join("meals.json");

        let mut store = RecordStore::load(&attendance_path, &meals_path).unwrap();
        store.check_in("STU002", "Ravi", day(), t("08:10")).unwrap();
        store.append_meal(breakfast("STU002")).unwrap();

        let reloaded = RecordStore::load(&attendance_path, &meals_path).unwrap();
        assert_eq!(reloaded.attendance(), store.attendance());
        assert_eq!(reloaded.meals(), store.meals());
    }

    #[test]
    fn failed_write_rolls_back_append() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let attendance_path = dir.path().join("attendance.json");
        let meals_path = blocker.join("meals.json");

        let mut store = RecordStore::load(&attendance_path, &meals_path).unwrap();
        store.check_in("STU002", "Ravi", day(), t("08:10")).unwrap();

        let err = store.append_meal(breakfast("STU002")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(store.meals().is_empty());
        assert_eq!(store.attendance().len(), 1);
    }

    #[test]
    fn in_memory_store_has_no_files() {
        let mut store = RecordStore::new();
        store.append_meal(breakfast("STU002")).unwrap();
        assert!(store.files().is_none());
        assert_eq!(store.meals().len(), 1);
    }

    #[test]
    fn load_reads_web_client_shape() {
        let dir = tempfile::tempdir().unwrap();
        let attendance_path = dir.path().join("attendance.json");
        fs::write(
            &attendance_path,
            r#"[{"studentId":"STU001","studentName":"Asha","date":"2024-01-15","time":"08:45","status":"present"}]"#,
        )
        .unwrap();

        let store = RecordStore::load(&attendance_path, &dir.path().join("meals.json")).unwrap();
        assert_eq!(store.attendance()[0].time, t("08:45"));
    }

    #[test]
    fn load_fails_loudly_on_bad_time() {
        let dir = tempfile::tempdir().unwrap();
        let attendance_path = dir.path().join("attendance.json");
        fs::write(
            &attendance_path,
            r#"[{"studentId":"STU001","studentName":"Asha","date":"2024-01-15","time":"8.45am","status":"present"}]"#,
        )
        .unwrap();

        let err = RecordStore::load(&attendance_path, &dir.path().join("meals.json")).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }
}
