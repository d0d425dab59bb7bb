//! Reconcile commands: build a day's sheet, record actual balances

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;
use tally_business::{BusinessError, ReconcileService};
use tally_core::ReconcileLine;

use crate::db;

/// Open the sheet for `date`, ensure lines and recompute
pub async fn run(db_path: &Path, config_path: Option<&Path>, date: NaiveDate, json: bool) -> Result<()> {
    let (db, ctx) = db::open(db_path, config_path).await?;
    let service = ReconcileService::new(&ctx);

    let day = service.reconcile_day(date).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&day.lines)?);
    } else {
        println!("📒 Reconcile sheet {} ({})", day.sheet.sheet_date, day.sheet.id);
        print_lines(&day.lines);
        println!();
        println!(
            "   Lines: {}  Mismatched: {}  Net diff: {}",
            day.lines.len(),
            day.mismatched().count(),
            day.net_diff()
        );
    }

    db.close().await;
    Ok(())
}

/// Record (or clear) a provider's actual balance on the date's sheet, then recompute
pub async fn set_actual(
    db_path: &Path,
    config_path: Option<&Path>,
    date: NaiveDate,
    provider_id: &str,
    actual: Option<Decimal>,
) -> Result<()> {
    let (db, ctx) = db::open(db_path, config_path).await?;
    let service = ReconcileService::new(&ctx);

    let sheet = service
        .find_sheet(date)
        .await?
        .ok_or_else(|| BusinessError::SheetNotFound(date.to_string()))
        .context("Run 'tally reconcile' for this date first")?;

    service
        .set_actual_balance(&sheet.id, provider_id, actual)
        .await?;
    let lines = service.recalc_sheet_lines(&sheet.id, date).await?;

    let line = lines
        .iter()
        .find(|l| l.provider_id == provider_id)
        .ok_or_else(|| BusinessError::line_not_found(&sheet.id, provider_id))?;

    match actual {
        Some(value) => println!("✅ Actual balance recorded: {} = {}", line.provider_name, value),
        None => println!("✅ Actual balance cleared: {}", line.provider_name),
    }
    println!("   Expected: {}", line.expected);
    println!("   Diff:     {}", format_opt(line.diff));
    println!("   Matched:  {}", if line.is_matched { "yes" } else { "no" });

    db.close().await;
    Ok(())
}

fn print_lines(lines: &[ReconcileLine]) {
    println!();
    println!(
        "   {:<20} {:>14} {:>12} {:>12} {:>14} {:>14} {:>10}  {}",
        "Provider", "Opening", "In", "Out", "Expected", "Actual", "Diff", "Match"
    );
    println!("   {}", "-".repeat(108));
    for line in lines {
        println!(
            "   {:<20} {:>14} {:>12} {:>12} {:>14} {:>14} {:>10}  {}",
            line.provider_name,
            line.opening,
            line.total_in,
            line.total_out,
            line.expected,
            format_opt(line.actual),
            format_opt(line.diff),
            if line.is_matched { "✓" } else { "" }
        );
    }
}

pub(crate) fn format_opt(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
