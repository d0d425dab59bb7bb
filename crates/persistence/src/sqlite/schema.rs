//! Database schema definitions
//!
//! Row types cho sqlx mapping từ SQLite tables.
//! Schema được định nghĩa trong migrations/20261017_init.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tally_core::{
    BalanceSnapshot, GameProvider, ProviderTransaction, ProviderTxKind, ReconcileLine,
    ReconcileSheet,
};

/// Row type cho bảng `game_providers`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProviderRow {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Row type cho bảng `balance_snapshots`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: String,
    pub provider_id: String,
    pub balance: String, // Decimal stored as TEXT
    pub taken_at: DateTime<Utc>,
}

/// Row type cho bảng `provider_transactions`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProviderTransactionRow {
    pub id: String,
    pub provider_id: String,
    pub kind: String,
    pub amount_signed: String, // Decimal stored as TEXT
    pub happened_at: DateTime<Utc>,
}

/// Row type cho bảng `reconcile_sheets`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SheetRow {
    pub id: String,
    pub sheet_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Row type cho bảng `reconcile_lines`, joined với `game_providers.name`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LineRow {
    pub id: String,
    pub sheet_id: String,
    pub provider_id: String,
    pub provider_name: String,
    pub opening: String,
    pub total_in: String,
    pub total_out: String,
    pub expected: String,
    pub actual: Option<String>,
    pub diff: Option<String>,
    pub is_matched: bool,
    pub updated_at: DateTime<Utc>,
}

/// Row type cho bảng `risk_rules`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RiskRuleRow {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Parse a TEXT money column back into an exact Decimal.
pub fn parse_decimal(field: &str, value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value)
        .map_err(|e| PersistenceError::InvalidDecimal(format!("{} = {:?}: {}", field, value, e)))
}

fn parse_optional_decimal(field: &str, value: Option<&str>) -> PersistenceResult<Option<Decimal>> {
    value.map(|v| parse_decimal(field, v)).transpose()
}

// === Conversion implementations ===

impl From<&GameProvider> for ProviderRow {
    fn from(provider: &GameProvider) -> Self {
        Self {
            id: provider.id.clone(),
            name: provider.name.clone(),
            is_active: provider.is_active,
            created_at: provider.created_at,
        }
    }
}

impl From<ProviderRow> for GameProvider {
    fn from(row: ProviderRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<SnapshotRow> for BalanceSnapshot {
    type Error = PersistenceError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            balance: parse_decimal("balance", &row.balance)?,
            id: row.id,
            provider_id: row.provider_id,
            taken_at: row.taken_at,
        })
    }
}

impl TryFrom<ProviderTransactionRow> for ProviderTransaction {
    type Error = PersistenceError;

    fn try_from(row: ProviderTransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: ProviderTxKind::from_str(&row.kind)?,
            amount_signed: parse_decimal("amount_signed", &row.amount_signed)?,
            id: row.id,
            provider_id: row.provider_id,
            happened_at: row.happened_at,
        })
    }
}

impl From<SheetRow> for ReconcileSheet {
    fn from(row: SheetRow) -> Self {
        Self {
            id: row.id,
            sheet_date: row.sheet_date,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<LineRow> for ReconcileLine {
    type Error = PersistenceError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            opening: parse_decimal("opening", &row.opening)?,
            total_in: parse_decimal("total_in", &row.total_in)?,
            total_out: parse_decimal("total_out", &row.total_out)?,
            expected: parse_decimal("expected", &row.expected)?,
            actual: parse_optional_decimal("actual", row.actual.as_deref())?,
            diff: parse_optional_decimal("diff", row.diff.as_deref())?,
            id: row.id,
            sheet_id: row.sheet_id,
            provider_id: row.provider_id,
            provider_name: row.provider_name,
            is_matched: row.is_matched,
            updated_at: row.updated_at,
        })
    }
}
