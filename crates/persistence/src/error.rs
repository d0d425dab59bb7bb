//! # Persistence Errors
//!
//! Error types cho persistence layer, wrapping sqlx và domain errors.

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    // === Conversion errors ===
    #[error("Invalid decimal value: {0}")]
    InvalidDecimal(String),

    #[error("Invalid stored value: {0}")]
    Core(#[from] tally_core::CoreError),
}

/// Result type alias cho PersistenceError
pub type PersistenceResult<T> = Result<T, PersistenceError>;

impl PersistenceError {
    /// Tạo NotFound error
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// Kiểm tra có phải lỗi not found không
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Kiểm tra có phải lỗi database không
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = PersistenceError::not_found("ReconcileSheet", "S_404");
        assert!(err.is_not_found());
        assert!(!err.is_database_error());
        assert_eq!(
            err.to_string(),
            "Record not found: ReconcileSheet with id S_404"
        );
    }

    #[test]
    fn test_database_error() {
        let err = PersistenceError::from(sqlx::Error::RowNotFound);
        assert!(err.is_database_error());
    }
}
