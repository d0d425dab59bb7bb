//! # Error Module
//!
//! Domain errors for Tally using thiserror. These cover parsing, day-window
//! resolution and line figures that leave the `Decimal` range.

use chrono::NaiveDate;
use thiserror::Error;

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {field} value: {value}")]
    InvalidKind { field: String, value: String },

    #[error("Invalid risk level: {0}")]
    InvalidRiskLevel(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Cannot resolve start of day {date} in timezone {timezone}")]
    UnresolvableDayStart { date: NaiveDate, timezone: String },

    #[error("Arithmetic overflow computing {0}")]
    ArithmeticOverflow(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid_kind(field: &str, value: &str) -> Self {
        Self::InvalidKind {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
