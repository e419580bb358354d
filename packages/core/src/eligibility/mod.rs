//! Meal Eligibility Module
//!
//! This module decides whether a student may receive a given meal on a given
//! day from the attendance log, the meal log, the current time and a table
//! of serving windows. It also derives eligible-student lists, distribution
//! statistics and per-student meal status from the same inputs.

pub mod engine;
pub mod types;
pub mod error;
pub mod config;


pub use engine::EligibilityEngine;
pub use types::*;
pub use error::EligibilityError;
pub use config::{MealWindow, MealWindows};
