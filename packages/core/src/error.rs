use thiserror::Error;

use crate::audit::AuditError;
use crate::distribution::DistributionError;
use crate::eligibility::EligibilityError;
use crate::report::ReportError;
use crate::store::StoreError;

/// Unified application error.
///
/// Every layer (config, record files, audit log, distribution, output)
/// surfaces through this type so `main` can report it in one place.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
