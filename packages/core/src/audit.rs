//! Append-only meal distribution audit log.
//!
//! Every successful distribution leaves one [`AuditEntry`] behind. The
//! [`AuditLog`] trait keeps the engine independent of where entries end up:
//! [`MemoryAuditLog`] for tests and embedding, [`JsonlAuditLog`] for a
//! one-object-per-line file on disk.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eligibility::types::{hhmm, truncate_to_minute, MealType, ValidationCode, ValidationResult};

/// One audited meal distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub student_id: String,
    pub meal_type: MealType,
    pub distributed_by: String,
    /// Code of the evaluation that authorised the distribution.
    pub validation_code: ValidationCode,
    #[serde(default, with = "hhmm::option", skip_serializing_if = "Option::is_none")]
    pub attendance_time: Option<NaiveTime>,
    /// Institution-local wall-clock time of the hand-out.
    #[serde(with = "hhmm")]
    pub distribution_time: NaiveTime,
}

impl AuditEntry {
    pub fn new(
        student_id: impl Into<String>,
        meal_type: MealType,
        distributed_by: impl Into<String>,
        result: &ValidationResult,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            timestamp: now.with_timezone(&Utc),
            student_id: student_id.into(),
            meal_type,
            distributed_by: distributed_by.into(),
            validation_code: result.code(),
            attendance_time: result.attendance().map(|a| a.time),
            distribution_time: truncate_to_minute(now.time()),
        }
    }
}

/// Errors from reading or writing an audit log
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit log I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed audit entry on line {line} of {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only sink for audit entries.
pub trait AuditLog {
    /// Append one entry. Existing entries are never touched.
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// All entries, oldest first.
    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Audit log kept in process memory
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Vec<AuditEntry>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self.entries.clone())
    }
}

/// Audit log stored as JSON Lines, one entry per line.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> AuditError {
        AuditError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl AuditLog for JsonlAuditLog {
    fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
        let line = serde_json::to_string(entry)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        writeln!(file, "{}", line).map_err(|e| self.io_error(e))?;

        tracing::debug!(
            "Audit entry appended to {} ({} {})",
            self.path.display(),
            entry.student_id,
            entry.meal_type
        );
        Ok(())
    }

    fn entries(&self) -> Result<Vec<AuditEntry>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|source| AuditError::Malformed {
                    path: self.path.clone(),
                    line: i + 1,
                    source,
                })
            })
            .collect()
    }
}
