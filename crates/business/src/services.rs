//! Service context and shared result types
//!
//! Every service borrows a [`ServiceContext`], which owns the pool, the
//! validated configuration and the resolved day window policy.

use crate::config::ReconConfig;
use crate::error::BusinessResult;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::sync::Arc;
use tally_core::{DayWindowPolicy, ReconcileLine, ReconcileSheet};
use tally_persistence::Database;
use tokio::sync::Mutex;

/// Context for business operations - database access plus resolved config
pub struct ServiceContext {
    pool: SqlitePool,
    config: Arc<ReconConfig>,
    policy: DayWindowPolicy,
    /// Serializes writers to the reconcile tables within this process.
    /// SQLite fails a deferred transaction that upgrades to a write lock
    /// while another writer is pending, instead of waiting.
    write_lock: Arc<Mutex<()>>,
}

impl ServiceContext {
    /// Create new service context from database
    pub fn new(db: &Database, config: ReconConfig) -> BusinessResult<Self> {
        Self::from_parts(db.pool().clone(), config)
    }

    /// Create from pool and config directly
    pub fn from_parts(pool: SqlitePool, config: ReconConfig) -> BusinessResult<Self> {
        config.validate()?;
        let policy = config.day_window_policy()?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            policy,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn day_window_policy(&self) -> &DayWindowPolicy {
        &self.policy
    }

    pub(crate) fn write_lock(&self) -> &Mutex<()> {
        &self.write_lock
    }
}

/// Sheet plus its freshly recomputed lines
#[derive(Debug, Clone)]
pub struct DayReconciliation {
    pub sheet: ReconcileSheet,
    pub lines: Vec<ReconcileLine>,
}

impl DayReconciliation {
    /// Lines that have an actual balance but do not match expected
    pub fn mismatched(&self) -> impl Iterator<Item = &ReconcileLine> {
        self.lines
            .iter()
            .filter(|line| line.actual.is_some() && !line.is_matched)
    }

    /// Sum of diffs across lines with an actual balance
    pub fn net_diff(&self) -> Decimal {
        self.lines.iter().filter_map(|line| line.diff).sum()
    }
}
