//! Repository implementations cho SQLite
//!
//! Functions that the reconcile recompute calls are generic over
//! `sqlx::Executor`, so they run on the pool or inside a transaction
//! (`&mut *tx`) unchanged.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Executor, Sqlite, SqlitePool};
use tally_core::{
    BalanceSnapshot, DayWindow, GameProvider, LineFigures, ProviderTransaction, ReconcileSheet,
};
use uuid::Uuid;

// ============================================================================
// Provider Repository
// ============================================================================

/// Repository cho game_providers table
pub struct ProviderRepo;

impl ProviderRepo {
    /// Thêm provider mới
    pub async fn insert(pool: &SqlitePool, provider: &GameProvider) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO game_providers (id, name, is_active, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&provider.id)
        .bind(&provider.name)
        .bind(provider.is_active)
        .bind(provider.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Lấy tất cả providers
    pub async fn get_all(pool: &SqlitePool) -> PersistenceResult<Vec<ProviderRow>> {
        let rows = sqlx::query_as::<_, ProviderRow>("SELECT * FROM game_providers ORDER BY name, id")
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Lấy providers đang active
    pub async fn get_active<'c, E>(executor: E) -> PersistenceResult<Vec<ProviderRow>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, ProviderRow>(
            "SELECT * FROM game_providers WHERE is_active = 1 ORDER BY name, id",
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Bật/tắt provider
    pub async fn set_active(pool: &SqlitePool, id: &str, is_active: bool) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE game_providers SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("GameProvider", id));
        }
        Ok(())
    }
}

// ============================================================================
// Snapshot Repository
// ============================================================================

/// Repository cho balance_snapshots table
pub struct SnapshotRepo;

impl SnapshotRepo {
    /// Thêm snapshot mới
    pub async fn insert(pool: &SqlitePool, snapshot: &BalanceSnapshot) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO balance_snapshots (id, provider_id, balance, taken_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&snapshot.id)
        .bind(&snapshot.provider_id)
        .bind(snapshot.balance.to_string())
        .bind(snapshot.taken_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Balance of the most recent snapshot with `taken_at < before`.
    pub async fn latest_before<'c, E>(
        executor: E,
        provider_id: &str,
        before: DateTime<Utc>,
    ) -> PersistenceResult<Option<Decimal>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT balance FROM balance_snapshots
            WHERE provider_id = ? AND taken_at < ?
            ORDER BY taken_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(provider_id)
        .bind(before)
        .fetch_optional(executor)
        .await?;

        row.map(|(balance,)| parse_decimal("balance", &balance))
            .transpose()
    }

    /// Lấy tất cả snapshots của provider, mới nhất trước
    pub async fn get_by_provider(
        pool: &SqlitePool,
        provider_id: &str,
    ) -> PersistenceResult<Vec<BalanceSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            "SELECT * FROM balance_snapshots WHERE provider_id = ? ORDER BY taken_at DESC, id DESC",
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(BalanceSnapshot::try_from).collect()
    }
}

// ============================================================================
// Provider Transaction Repository
// ============================================================================

/// Repository cho provider_transactions table
pub struct ProviderTransactionRepo;

impl ProviderTransactionRepo {
    /// Thêm transaction mới
    pub async fn insert(pool: &SqlitePool, tx: &ProviderTransaction) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO provider_transactions (id, provider_id, kind, amount_signed, happened_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.provider_id)
        .bind(tx.kind.as_str())
        .bind(tx.amount_signed.to_string())
        .bind(tx.happened_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Signed amounts with `happened_at` inside `window`.
    pub async fn amounts_in_window<'c, E>(
        executor: E,
        provider_id: &str,
        window: &DayWindow,
    ) -> PersistenceResult<Vec<Decimal>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT amount_signed FROM provider_transactions
            WHERE provider_id = ? AND happened_at >= ? AND happened_at < ?
            ORDER BY happened_at, id
            "#,
        )
        .bind(provider_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(executor)
        .await?;

        rows.iter()
            .map(|(amount,)| parse_decimal("amount_signed", amount))
            .collect()
    }

    /// Lấy transactions theo provider
    pub async fn get_by_provider(
        pool: &SqlitePool,
        provider_id: &str,
    ) -> PersistenceResult<Vec<ProviderTransaction>> {
        let rows = sqlx::query_as::<_, ProviderTransactionRow>(
            "SELECT * FROM provider_transactions WHERE provider_id = ? ORDER BY happened_at DESC, id DESC",
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(ProviderTransaction::try_from).collect()
    }

    /// Đếm transactions
    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM provider_transactions")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Sheet Repository
// ============================================================================

/// Repository cho reconcile_sheets table
pub struct SheetRepo;

impl SheetRepo {
    /// Insert unless a sheet already exists for the date. Returns true if inserted.
    pub async fn insert_if_absent(
        pool: &SqlitePool,
        sheet: &ReconcileSheet,
    ) -> PersistenceResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO reconcile_sheets (id, sheet_date, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(sheet_date) DO NOTHING
            "#,
        )
        .bind(&sheet.id)
        .bind(sheet.sheet_date)
        .bind(sheet.created_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Lấy sheet theo ID
    pub async fn get_by_id<'c, E>(executor: E, id: &str) -> PersistenceResult<SheetRow>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        sqlx::query_as::<_, SheetRow>("SELECT * FROM reconcile_sheets WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| PersistenceError::not_found("ReconcileSheet", id))
    }

    /// Lấy sheet theo ngày
    pub async fn get_by_date(
        pool: &SqlitePool,
        date: NaiveDate,
    ) -> PersistenceResult<Option<SheetRow>> {
        let row = sqlx::query_as::<_, SheetRow>("SELECT * FROM reconcile_sheets WHERE sheet_date = ?")
            .bind(date)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Đếm sheets
    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reconcile_sheets")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Line Repository
// ============================================================================

/// Repository cho reconcile_lines table
pub struct LineRepo;

impl LineRepo {
    /// Create a zeroed line for (sheet, provider) unless one exists.
    ///
    /// Relies on `UNIQUE(sheet_id, provider_id)`, so concurrent callers can
    /// never duplicate or reset a line. Returns true if a row was inserted.
    pub async fn insert_if_absent<'c, E>(
        executor: E,
        sheet_id: &str,
        provider_id: &str,
    ) -> PersistenceResult<bool>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO reconcile_lines (
                id, sheet_id, provider_id,
                opening, total_in, total_out, expected,
                actual, diff, is_matched, updated_at
            )
            VALUES (?, ?, ?, '0', '0', '0', '0', NULL, NULL, 0, ?)
            ON CONFLICT(sheet_id, provider_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(sheet_id)
        .bind(provider_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Lines of a sheet joined with provider name, ordered by provider name.
    pub async fn get_by_sheet<'c, E>(executor: E, sheet_id: &str) -> PersistenceResult<Vec<LineRow>>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT
                l.id, l.sheet_id, l.provider_id, p.name AS provider_name,
                l.opening, l.total_in, l.total_out, l.expected,
                l.actual, l.diff, l.is_matched, l.updated_at
            FROM reconcile_lines l
            JOIN game_providers p ON p.id = l.provider_id
            WHERE l.sheet_id = ?
            ORDER BY p.name ASC, l.provider_id ASC
            "#,
        )
        .bind(sheet_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Persist recomputed figures. `actual` is left untouched.
    pub async fn update_figures<'c, E>(
        executor: E,
        line_id: &str,
        figures: &LineFigures,
        updated_at: DateTime<Utc>,
    ) -> PersistenceResult<()>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE reconcile_lines SET
                opening = ?, total_in = ?, total_out = ?, expected = ?,
                diff = ?, is_matched = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(figures.opening.to_string())
        .bind(figures.total_in.to_string())
        .bind(figures.total_out.to_string())
        .bind(figures.expected.to_string())
        .bind(figures.diff.map(|d| d.to_string()))
        .bind(figures.is_matched)
        .bind(updated_at)
        .bind(line_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("ReconcileLine", line_id));
        }
        Ok(())
    }

    /// Record (or clear) the provider-reported actual closing balance.
    pub async fn set_actual<'c, E>(
        executor: E,
        sheet_id: &str,
        provider_id: &str,
        actual: Option<Decimal>,
    ) -> PersistenceResult<()>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE reconcile_lines SET actual = ?, updated_at = ? WHERE sheet_id = ? AND provider_id = ?",
        )
        .bind(actual.map(|a| a.to_string()))
        .bind(Utc::now())
        .bind(sheet_id)
        .bind(provider_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found(
                "ReconcileLine",
                &format!("{}:{}", sheet_id, provider_id),
            ));
        }
        Ok(())
    }

    /// Đếm lines
    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reconcile_lines")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Risk Rule Repository
// ============================================================================

/// Repository cho risk_rules table (keyed rule store)
pub struct RiskRuleRepo;

impl RiskRuleRepo {
    pub async fn get(pool: &SqlitePool, key: &str) -> PersistenceResult<Option<RiskRuleRow>> {
        let row = sqlx::query_as::<_, RiskRuleRow>("SELECT * FROM risk_rules WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Rule value parsed as a Decimal
    pub async fn get_decimal(pool: &SqlitePool, key: &str) -> PersistenceResult<Option<Decimal>> {
        Self::get(pool, key)
            .await?
            .map(|row| parse_decimal(key, &row.value))
            .transpose()
    }

    /// Upsert rule (insert hoặc update)
    pub async fn upsert(pool: &SqlitePool, key: &str, value: &str) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO risk_rules (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Khởi tạo database connection pool
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = SqlitePool::connect(database_url).await?;
    Ok(pool)
}

/// Chạy migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Tạo database mới với schema
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    // Tạo file nếu chưa có
    let pool = SqlitePool::connect_with(
        database_url
            .parse::<SqliteConnectOptions>()?
            .create_if_missing(true),
    )
    .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}
