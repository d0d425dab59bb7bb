//! Database initialization, status and service wiring

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use tally_business::{ReconConfig, RiskService, ServiceContext};
use tally_core::{BalanceSnapshot, GameProvider, ProviderTransaction, ProviderTxKind};
use tally_persistence::{
    Database, LineRepo, ProviderRepo, ProviderTransactionRepo, SheetRepo, SnapshotRepo,
};

fn db_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

/// Initialize the database with schema
pub async fn init_database(db_path: &Path, force: bool, demo: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }

    println!("📦 Running migrations...");
    let db = Database::init_with_migrations(&db_url(db_path))
        .await
        .context("Failed to initialize database")?;

    if demo {
        seed_demo(&db).await?;
    }

    db.close().await;
    Ok(())
}

/// Open the database and build a service context from the optional config file
pub async fn open(db_path: &Path, config_path: Option<&Path>) -> Result<(Database, ServiceContext)> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {:?}. Run 'tally init' first.",
            db_path
        );
    }

    let config = match config_path {
        Some(path) => ReconConfig::from_file(path)?,
        None => ReconConfig::default(),
    };

    let db = Database::new(&db_url(db_path))
        .await
        .context("Failed to connect to database")?;
    let ctx = ServiceContext::new(&db, config)?;
    Ok((db, ctx))
}

/// Show database status
pub async fn show_status(db_path: &Path, config_path: Option<&Path>) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'tally init' to create the database");
        return Ok(());
    }

    let (db, ctx) = open(db_path, config_path).await?;
    let pool = db.pool();

    let providers = ProviderRepo::get_all(pool).await?;
    let active = providers.iter().filter(|p| p.is_active).count();
    let transactions = ProviderTransactionRepo::count(pool).await?;
    let sheets = SheetRepo::count(pool).await?;
    let lines = LineRepo::count(pool).await?;
    let threshold = RiskService::new(&ctx).threshold().await?;

    println!("📊 Database Status");
    println!("   Path: {:?}", db_path);
    println!();
    println!("   Providers:    {} ({} active)", providers.len(), active);
    println!("   Transactions: {}", transactions);
    println!("   Sheets:       {}", sheets);
    println!("   Lines:        {}", lines);
    println!();
    println!("   Timezone:     {}", ctx.config().timezone);
    println!("   Threshold:    {}", threshold);

    db.close().await;
    Ok(())
}

/// Seed demo providers with a closing snapshot for yesterday and flows for today (UTC)
async fn seed_demo(db: &Database) -> Result<()> {
    let pool = db.pool();
    if !ProviderRepo::get_all(pool).await?.is_empty() {
        println!("ℹ️  Providers already present, skipping demo data");
        return Ok(());
    }

    println!("🌱 Seeding demo data...");
    let today = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .context("Invalid midnight")?
        .and_utc();

    let providers = [
        GameProvider::new("PG", "PG Soft"),
        GameProvider::new("EVO", "Evolution"),
        GameProvider::new("JILI", "Jili Games").deactivated(),
    ];
    for provider in &providers {
        ProviderRepo::insert(pool, provider).await?;
    }

    let snapshots = [
        ("SN_PG", "PG", Decimal::new(100000, 2)),
        ("SN_EVO", "EVO", Decimal::new(250000, 2)),
    ];
    for (id, provider_id, balance) in snapshots {
        let taken_at = today - Duration::minutes(1);
        SnapshotRepo::insert(pool, &BalanceSnapshot::new(id, provider_id, balance, taken_at))
            .await?;
    }

    let flows = [
        ("TX_PG_1", "PG", ProviderTxKind::CreditIn, Decimal::new(5025, 2), 8),
        ("TX_PG_2", "PG", ProviderTxKind::CreditOut, Decimal::new(2000, 2), 12),
        ("TX_PG_3", "PG", ProviderTxKind::CreditIn, Decimal::new(975, 2), 18),
        ("TX_EVO_1", "EVO", ProviderTxKind::CreditOut, Decimal::new(12000, 2), 10),
        ("TX_EVO_2", "EVO", ProviderTxKind::Adjustment, Decimal::new(-150, 2), 11),
    ];
    for (id, provider_id, kind, amount, hour) in flows {
        let tx = ProviderTransaction::new(id, provider_id, kind, amount, today + Duration::hours(hour));
        ProviderTransactionRepo::insert(pool, &tx).await?;
    }

    println!(
        "   {} providers, {} snapshots, {} transactions for {}",
        providers.len(),
        snapshots.len(),
        flows.len(),
        today.date_naive()
    );
    Ok(())
}
