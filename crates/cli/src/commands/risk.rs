//! Risk commands: sheet summary and threshold rule

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;
use tally_business::{BusinessError, ReconcileService, RiskService};
use tally_core::RiskLevel;

use crate::commands::reconcile::format_opt;
use crate::db;
use crate::ThresholdAction;

/// Print the risk summary of the date's sheet. Returns true if any line is DANGER.
pub async fn report(
    db_path: &Path,
    config_path: Option<&Path>,
    date: NaiveDate,
    threshold: Option<Decimal>,
    json: bool,
) -> Result<bool> {
    let (db, ctx) = db::open(db_path, config_path).await?;

    let sheet = ReconcileService::new(&ctx)
        .find_sheet(date)
        .await?
        .ok_or_else(|| BusinessError::SheetNotFound(date.to_string()))?;

    let risk = RiskService::new(&ctx);
    let summary = risk.sheet_summary(&sheet.id, threshold).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("🔍 Risk report for {} (threshold {})", sheet.sheet_date, summary.threshold);
        println!();
        for (line, verdict) in risk.sheet_line_risks(&sheet.id, Some(summary.threshold)).await? {
            let icon = match verdict.level {
                RiskLevel::Ok => "✅",
                RiskLevel::Warn => "⚠️ ",
                RiskLevel::Danger => "🚨",
            };
            println!(
                "   {} {:<7} {:<20} diff {:>10}  {}",
                icon,
                verdict.level.as_str(),
                line.provider_name,
                format_opt(line.diff),
                verdict.reason
            );
        }
        println!();
        println!("   WARN:   {}", summary.warn_count);
        println!("   DANGER: {}", summary.danger_count);
        for danger in &summary.danger_lines {
            println!("     - {} ({}): {}", danger.provider_name, danger.provider_id, danger.diff);
        }
    }

    db.close().await;
    Ok(summary.has_danger())
}

/// Show or update the diff threshold rule
pub async fn threshold(db_path: &Path, config_path: Option<&Path>, action: ThresholdAction) -> Result<()> {
    let (db, ctx) = db::open(db_path, config_path).await?;
    let risk = RiskService::new(&ctx);

    match action {
        ThresholdAction::Show => {
            println!("Diff threshold: {}", risk.threshold().await?);
        }
        ThresholdAction::Set { value } => {
            risk.set_threshold(value).await?;
            println!("✅ Diff threshold set to {}", value);
        }
    }

    db.close().await;
    Ok(())
}
