//! Business layer errors
//!
//! Uses anyhow for error aggregation with custom error types. Storage
//! failures are propagated with context, so callers can still
//! `downcast_ref::<PersistenceError>()` on them.

use rust_decimal::Decimal;
use thiserror::Error;

/// Business operation errors
#[derive(Debug, Error)]
pub enum BusinessError {
    // === Not found errors ===
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Line not found: sheet {sheet_id}, provider {provider_id}")]
    LineNotFound {
        sheet_id: String,
        provider_id: String,
    },

    // === Validation errors ===
    #[error("Invalid risk threshold: {0} (must be >= 0)")]
    InvalidThreshold(Decimal),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Concurrency errors ===
    #[error("Line creation task failed: {0}")]
    LineTaskFailed(String),

    // === Wrapped errors ===
    #[error("Core error: {0}")]
    Core(#[from] tally_core::CoreError),
}

/// Result type alias for business operations
pub type BusinessResult<T> = anyhow::Result<T>;

impl BusinessError {
    /// Create line not found error
    pub fn line_not_found(sheet_id: &str, provider_id: &str) -> Self {
        Self::LineNotFound {
            sheet_id: sheet_id.to_string(),
            provider_id: provider_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_not_found_error() {
        let err = BusinessError::line_not_found("S1", "PG");
        assert_eq!(err.to_string(), "Line not found: sheet S1, provider PG");
    }

    #[test]
    fn test_invalid_threshold_error() {
        let err = BusinessError::InvalidThreshold(dec!(-1));
        assert!(err.to_string().contains("-1"));
    }
}
