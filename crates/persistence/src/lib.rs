//! # Tally Persistence
//!
//! Persistence layer cho Tally - SQLite state for the reconciliation engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Database                             │
//! │  ┌──────────────────┐   ┌───────────────┐   ┌─────────────┐  │
//! │  │ providers /      │   │ sheets /      │   │ risk_rules  │  │
//! │  │ snapshots / txs  │   │ lines         │   │ (keyed)     │  │
//! │  │ (read-only)      │   │ (read-write)  │   │             │  │
//! │  └──────────────────┘   └───────────────┘   └─────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_persistence::{Database, LineRepo};
//!
//! let db = Database::init_with_migrations("sqlite:data/tally.db").await?;
//! let lines = LineRepo::get_by_sheet(db.pool(), &sheet_id).await?;
//! ```

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::schema::{
    LineRow, ProviderRow, ProviderTransactionRow, RiskRuleRow, SheetRow, SnapshotRow,
};
pub use sqlite::{
    init_database, LineRepo, ProviderRepo, ProviderTransactionRepo, RiskRuleRepo, SheetRepo,
    SnapshotRepo,
};

use sqlx::SqlitePool;

/// Database facade
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to an existing database
    ///
    /// # Arguments
    /// * `db_url` - SQLite database URL (e.g., "sqlite:tally.db")
    pub async fn new(db_url: &str) -> PersistenceResult<Self> {
        let pool = sqlite::create_pool(db_url).await?;
        Ok(Self { pool })
    }

    /// Create the database file if needed and run migrations
    pub async fn init_with_migrations(db_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(db_url).await?;
        Ok(Self { pool })
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
