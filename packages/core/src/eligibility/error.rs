//! Error types for eligibility configuration and input parsing

use thiserror::Error;

/// Errors raised while building eligibility inputs.
///
/// Evaluating eligibility never fails; these only surface when a time
/// string or a meal window is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("Invalid time '{value}': expected HH:MM (24-hour)")]
    InvalidTime { value: String },

    #[error("Invalid meal window '{value}': expected HH:MM-HH:MM")]
    InvalidWindowFormat { value: String },

    #[error("Invalid meal window {start}-{end}: end must not be earlier than start")]
    InvalidWindow { start: String, end: String },
}

impl EligibilityError {
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTime { value: value.into() }
    }

    pub fn invalid_window_format(value: impl Into<String>) -> Self {
        Self::InvalidWindowFormat { value: value.into() }
    }
}
