//! Reconcile operations - ensure lines, recompute figures, record actuals
//!
//! ReconcileService drives one daily sheet:
//! - `ensure_sheet_lines`: one line per active provider, then recompute
//! - `recalc_sheet_lines`: recompute every line inside one DB transaction
//! - `set_actual_balance`: record the provider-reported closing balance

use crate::error::{BusinessError, BusinessResult};
use crate::services::{DayReconciliation, ServiceContext};
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_core::{LineFigures, ReconcileLine, ReconcileSheet};
use tally_persistence::{
    LineRepo, PersistenceError, ProviderRepo, ProviderTransactionRepo, SheetRepo, SnapshotRepo,
};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Reconcile Service - builds and recomputes daily sheets
pub struct ReconcileService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReconcileService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Get the sheet for `date`, creating it if absent
    #[instrument(skip(self), fields(date = %date))]
    pub async fn open_sheet(&self, date: NaiveDate) -> BusinessResult<ReconcileSheet> {
        let candidate = ReconcileSheet {
            id: Uuid::new_v4().to_string(),
            sheet_date: date,
            created_at: Utc::now(),
        };

        let created = SheetRepo::insert_if_absent(self.ctx.pool(), &candidate)
            .await
            .context("Failed to create reconcile sheet")?;

        let sheet = SheetRepo::get_by_date(self.ctx.pool(), date)
            .await
            .context("Failed to load reconcile sheet")?
            .ok_or_else(|| BusinessError::SheetNotFound(date.to_string()))?;

        if created {
            info!(sheet_id = %sheet.id, "Opened new reconcile sheet");
        }

        Ok(sheet.into())
    }

    /// Look up an existing sheet by date
    pub async fn find_sheet(&self, date: NaiveDate) -> BusinessResult<Option<ReconcileSheet>> {
        let row = SheetRepo::get_by_date(self.ctx.pool(), date)
            .await
            .context("Failed to load reconcile sheet")?;
        Ok(row.map(ReconcileSheet::from))
    }

    /// Ensure the sheet has a line for every active provider, then recompute.
    ///
    /// Missing lines are created concurrently; an existing line is never
    /// duplicated or reset, even under concurrent callers.
    #[instrument(skip(self), fields(sheet_id = %sheet_id, date = %date))]
    pub async fn ensure_sheet_lines(
        &self,
        sheet_id: &str,
        date: NaiveDate,
    ) -> BusinessResult<Vec<ReconcileLine>> {
        let _guard = self.ctx.write_lock().lock().await;

        self.check_sheet_date(self.ctx.pool(), sheet_id, date).await?;

        let providers = ProviderRepo::get_active(self.ctx.pool())
            .await
            .context("Failed to load active providers")?;

        let mut tasks = JoinSet::new();
        for provider in providers {
            let pool = self.ctx.pool().clone();
            let sheet_id = sheet_id.to_string();
            tasks.spawn(async move {
                let created = LineRepo::insert_if_absent(&pool, &sheet_id, &provider.id).await?;
                Ok::<_, PersistenceError>((provider.id, created))
            });
        }

        let mut created = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let (provider_id, inserted) = joined
                .map_err(|e| BusinessError::LineTaskFailed(e.to_string()))?
                .context("Failed to create reconcile line")?;
            if inserted {
                created += 1;
                debug!(provider_id = %provider_id, "Created reconcile line");
            }
        }
        info!(created, "Sheet lines ensured");

        self.recalc_locked(sheet_id, date).await
    }

    /// Recompute opening/in/out/expected/diff/matched for every line of the
    /// sheet. All reads and writes run in one transaction: either every line
    /// is updated or none is.
    #[instrument(skip(self), fields(sheet_id = %sheet_id, date = %date))]
    pub async fn recalc_sheet_lines(
        &self,
        sheet_id: &str,
        date: NaiveDate,
    ) -> BusinessResult<Vec<ReconcileLine>> {
        let _guard = self.ctx.write_lock().lock().await;
        self.recalc_locked(sheet_id, date).await
    }

    /// Open (or reuse) the sheet for `date`, ensure its lines and recompute
    #[instrument(skip(self), fields(date = %date))]
    pub async fn reconcile_day(&self, date: NaiveDate) -> BusinessResult<DayReconciliation> {
        let sheet = self.open_sheet(date).await?;
        let lines = self.ensure_sheet_lines(&sheet.id, date).await?;
        Ok(DayReconciliation { sheet, lines })
    }

    /// Record the provider-reported closing balance on a line.
    ///
    /// Only `actual` changes; call `recalc_sheet_lines` to refresh the diff.
    #[instrument(skip(self), fields(sheet_id = %sheet_id, provider_id = %provider_id))]
    pub async fn set_actual_balance(
        &self,
        sheet_id: &str,
        provider_id: &str,
        actual: Option<Decimal>,
    ) -> BusinessResult<()> {
        let _guard = self.ctx.write_lock().lock().await;

        LineRepo::set_actual(self.ctx.pool(), sheet_id, provider_id, actual)
            .await
            .map_err(|e| match e {
                PersistenceError::NotFound { .. } => {
                    anyhow::Error::from(BusinessError::line_not_found(sheet_id, provider_id))
                }
                other => anyhow::Error::from(other).context("Failed to record actual balance"),
            })?;

        match actual {
            Some(value) => info!(actual = %value, "Recorded actual balance"),
            None => info!("Cleared actual balance"),
        }
        Ok(())
    }

    /// Persisted lines of a sheet, without recomputing
    pub async fn sheet_lines(&self, sheet_id: &str) -> BusinessResult<Vec<ReconcileLine>> {
        SheetRepo::get_by_id(self.ctx.pool(), sheet_id)
            .await
            .map_err(|e| sheet_lookup_error(sheet_id, e))?;

        let rows = LineRepo::get_by_sheet(self.ctx.pool(), sheet_id)
            .await
            .context("Failed to load reconcile lines")?;
        rows.into_iter()
            .map(ReconcileLine::try_from)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode reconcile lines")
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn recalc_locked(
        &self,
        sheet_id: &str,
        date: NaiveDate,
    ) -> BusinessResult<Vec<ReconcileLine>> {
        let window = self
            .ctx
            .day_window_policy()
            .window(date)
            .map_err(BusinessError::from)?;

        let mut tx = self
            .ctx
            .pool()
            .begin()
            .await
            .context("Failed to begin recompute transaction")?;

        self.check_sheet_date(&mut *tx, sheet_id, date).await?;

        let rows = LineRepo::get_by_sheet(&mut *tx, sheet_id)
            .await
            .context("Failed to load reconcile lines")?;

        let now = Utc::now();
        let mut updated = 0usize;
        for row in rows {
            let line = ReconcileLine::try_from(row).context("Failed to decode reconcile line")?;

            let opening = SnapshotRepo::latest_before(&mut *tx, &line.provider_id, window.start)
                .await
                .context("Failed to load opening snapshot")?
                .unwrap_or(Decimal::ZERO);
            let amounts =
                ProviderTransactionRepo::amounts_in_window(&mut *tx, &line.provider_id, &window)
                    .await
                    .context("Failed to load provider transactions")?;

            let figures = LineFigures::compute(opening, &amounts, line.actual)
                .map_err(BusinessError::from)
                .with_context(|| {
                    format!("Failed to compute line for provider {}", line.provider_id)
                })?;

            // Unchanged lines keep their row (and updated_at) as is
            if figures == line.figures() {
                continue;
            }

            LineRepo::update_figures(&mut *tx, &line.id, &figures, now)
                .await
                .context("Failed to update reconcile line")?;
            updated += 1;
            debug!(
                provider_id = %line.provider_id,
                expected = %figures.expected,
                matched = figures.is_matched,
                "Recomputed line"
            );
        }

        let lines = LineRepo::get_by_sheet(&mut *tx, sheet_id)
            .await
            .context("Failed to reload reconcile lines")?
            .into_iter()
            .map(ReconcileLine::try_from)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode reconcile lines")?;

        tx.commit()
            .await
            .context("Failed to commit recompute transaction")?;

        info!(lines = lines.len(), updated, "Sheet lines recomputed");
        Ok(lines)
    }

    /// Fails with `SheetNotFound` for unknown sheets; warns when `date` is not
    /// the sheet's own date.
    async fn check_sheet_date<'c, E>(
        &self,
        executor: E,
        sheet_id: &str,
        date: NaiveDate,
    ) -> BusinessResult<()>
    where
        E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
    {
        let sheet = SheetRepo::get_by_id(executor, sheet_id)
            .await
            .map_err(|e| sheet_lookup_error(sheet_id, e))?;

        if sheet.sheet_date != date {
            warn!(
                sheet_date = %sheet.sheet_date,
                requested = %date,
                "Recomputing sheet with a date other than its own"
            );
        }
        Ok(())
    }
}

fn sheet_lookup_error(sheet_id: &str, err: PersistenceError) -> anyhow::Error {
    if err.is_not_found() {
        BusinessError::SheetNotFound(sheet_id.to_string()).into()
    } else {
        anyhow::Error::from(err).context("Failed to load reconcile sheet")
    }
}
