//! SQLite persistence module
//!
//! Repository pattern cho SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    create_pool, init_database, run_migrations, LineRepo, ProviderRepo, ProviderTransactionRepo,
    RiskRuleRepo, SheetRepo, SnapshotRepo,
};
pub use schema::{
    parse_decimal, LineRow, ProviderRow, ProviderTransactionRow, RiskRuleRow, SheetRow,
    SnapshotRow,
};
