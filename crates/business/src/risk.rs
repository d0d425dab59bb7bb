//! Risk operations - threshold rule and per-sheet risk summaries
//!
//! The diff threshold lives in the risk rule store under
//! [`DIFF_THRESHOLD_KEY`]; the configured `risk_threshold` is the fallback.

use crate::error::{BusinessError, BusinessResult};
use crate::reconcile::ReconcileService;
use crate::services::ServiceContext;
use anyhow::Context;
use rust_decimal::Decimal;
use tally_core::{evaluate_line, summarize_risks, LineRisk, ReconcileLine, RiskSummary};
use tally_persistence::RiskRuleRepo;
use tracing::{info, instrument};

/// Rule store key of the diff threshold
pub const DIFF_THRESHOLD_KEY: &str = "recon.diff_threshold";

/// Risk Service - resolves the threshold and classifies sheet lines
pub struct RiskService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RiskService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Effective threshold: stored rule if present, else configuration.
    /// A negative stored rule is rejected, not applied.
    pub async fn threshold(&self) -> BusinessResult<Decimal> {
        let stored = RiskRuleRepo::get_decimal(self.ctx.pool(), DIFF_THRESHOLD_KEY)
            .await
            .context("Failed to read diff threshold rule")?;

        match stored {
            Some(value) if value < Decimal::ZERO => {
                Err(BusinessError::InvalidThreshold(value).into())
            }
            Some(value) => Ok(value),
            None => Ok(self.ctx.config().risk_threshold),
        }
    }

    /// Store a new threshold rule
    #[instrument(skip(self), fields(value = %value))]
    pub async fn set_threshold(&self, value: Decimal) -> BusinessResult<()> {
        if value < Decimal::ZERO {
            return Err(BusinessError::InvalidThreshold(value).into());
        }

        RiskRuleRepo::upsert(self.ctx.pool(), DIFF_THRESHOLD_KEY, &value.to_string())
            .await
            .context("Failed to store diff threshold rule")?;

        info!("Diff threshold updated");
        Ok(())
    }

    /// Summarize the persisted lines of a sheet.
    /// `threshold` overrides the effective threshold when given.
    pub async fn sheet_summary(
        &self,
        sheet_id: &str,
        threshold: Option<Decimal>,
    ) -> BusinessResult<RiskSummary> {
        let threshold = self.resolve(threshold).await?;
        let lines = ReconcileService::new(self.ctx).sheet_lines(sheet_id).await?;
        Ok(summarize_risks(&lines, threshold))
    }

    /// Per-line verdicts for a sheet, in provider name order
    pub async fn sheet_line_risks(
        &self,
        sheet_id: &str,
        threshold: Option<Decimal>,
    ) -> BusinessResult<Vec<(ReconcileLine, LineRisk)>> {
        let threshold = self.resolve(threshold).await?;
        let lines = ReconcileService::new(self.ctx).sheet_lines(sheet_id).await?;
        Ok(lines
            .into_iter()
            .map(|line| {
                let risk = evaluate_line(&line, threshold);
                (line, risk)
            })
            .collect())
    }

    async fn resolve(&self, threshold: Option<Decimal>) -> BusinessResult<Decimal> {
        match threshold {
            Some(value) if value < Decimal::ZERO => {
                Err(BusinessError::InvalidThreshold(value).into())
            }
            Some(value) => Ok(value),
            None => self.threshold().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use rust_decimal_macros::dec;
    use tally_persistence::init_database;
    use tempfile::TempDir;

    async fn setup(config: ReconConfig) -> (TempDir, ServiceContext) {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("tally.db").display());
        let pool = init_database(&url).await.unwrap();
        let ctx = ServiceContext::from_parts(pool, config).unwrap();
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_threshold_falls_back_to_config() {
        let config = ReconConfig {
            risk_threshold: dec!(25),
            ..ReconConfig::default()
        };
        let (_dir, ctx) = setup(config).await;
        let service = RiskService::new(&ctx);

        assert_eq!(service.threshold().await.unwrap(), dec!(25));

        service.set_threshold(dec!(2.50)).await.unwrap();
        assert_eq!(service.threshold().await.unwrap(), dec!(2.50));
    }

    #[tokio::test]
    async fn test_negative_threshold_rejected() {
        let (_dir, ctx) = setup(ReconConfig::default()).await;
        let service = RiskService::new(&ctx);

        let err = service.set_threshold(dec!(-0.01)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BusinessError>(),
            Some(BusinessError::InvalidThreshold(_))
        ));
        assert_eq!(service.threshold().await.unwrap(), dec!(10));

        let err = service.sheet_summary("S1", Some(dec!(-1))).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BusinessError>(),
            Some(BusinessError::InvalidThreshold(_))
        ));
    }

    #[tokio::test]
    async fn test_negative_stored_rule_rejected() {
        let (_dir, ctx) = setup(ReconConfig::default()).await;
        RiskRuleRepo::upsert(ctx.pool(), DIFF_THRESHOLD_KEY, "-5")
            .await
            .unwrap();
        let service = RiskService::new(&ctx);

        let err = service.threshold().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BusinessError>(),
            Some(BusinessError::InvalidThreshold(v)) if *v == dec!(-5)
        ));

        // Reports relying on the stored rule fail too, until a valid rule replaces it
        let err = service.sheet_summary("S1", None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BusinessError>(),
            Some(BusinessError::InvalidThreshold(_))
        ));
        service.set_threshold(dec!(5)).await.unwrap();
        assert_eq!(service.threshold().await.unwrap(), dec!(5));
    }

    #[tokio::test]
    async fn test_summary_unknown_sheet() {
        let (_dir, ctx) = setup(ReconConfig::default()).await;
        let err = RiskService::new(&ctx)
            .sheet_summary("NOPE", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BusinessError>(),
            Some(BusinessError::SheetNotFound(_))
        ));
    }
}
