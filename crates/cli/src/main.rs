//! Tally CLI - daily provider balance reconciliation
//!
//! Usage:
//! ```bash
//! tally init --demo
//! tally reconcile --date 2026-03-01
//! tally actual --date 2026-03-01 --provider PG --balance 1045.50
//! tally risk --date 2026-03-01 --threshold 5
//! tally threshold set 10
//! ```

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{reconcile, risk};

/// Tally - reconcile provider balances and flag risky discrepancies
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/tally.db", global = true)]
    pub db: PathBuf,

    /// Reconciliation config file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize database with schema
    Init {
        /// Force re-initialization (drops existing data)
        #[arg(long)]
        force: bool,
        /// Seed demo providers, snapshots and transactions for today
        #[arg(long)]
        demo: bool,
    },

    /// Show database status
    Status,

    /// Open the day's sheet, ensure lines and recompute them
    Reconcile {
        /// Sheet date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Print lines as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a provider-reported closing balance, then recompute
    Actual {
        /// Sheet date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Provider ID
        #[arg(long)]
        provider: String,
        /// Actual closing balance
        #[arg(long, conflicts_with = "clear", required_unless_present = "clear")]
        balance: Option<Decimal>,
        /// Remove the recorded balance instead
        #[arg(long)]
        clear: bool,
    },

    /// Risk summary of a sheet (exit code 2 when any line is DANGER)
    Risk {
        /// Sheet date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Override the stored threshold for this report
        #[arg(long)]
        threshold: Option<Decimal>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the diff threshold rule
    Threshold {
        #[command(subcommand)]
        action: ThresholdAction,
    },
}

#[derive(Subcommand)]
pub enum ThresholdAction {
    /// Show the effective threshold
    Show,
    /// Store a new threshold
    Set {
        /// Max tolerated |diff| before DANGER
        value: Decimal,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Ensure data directory exists
    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    match cli.command {
        Commands::Init { force, demo } => {
            db::init_database(&cli.db, force, demo).await?;
            println!("✅ Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db, cli.config.as_deref()).await?;
        }

        Commands::Reconcile { date, json } => {
            reconcile::run(&cli.db, cli.config.as_deref(), date, json).await?;
        }

        Commands::Actual {
            date,
            provider,
            balance,
            clear,
        } => {
            let actual = if clear { None } else { balance };
            reconcile::set_actual(&cli.db, cli.config.as_deref(), date, &provider, actual).await?;
        }

        Commands::Risk {
            date,
            threshold,
            json,
        } => {
            let has_danger =
                risk::report(&cli.db, cli.config.as_deref(), date, threshold, json).await?;
            if has_danger {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::Threshold { action } => {
            risk::threshold(&cli.db, cli.config.as_deref(), action).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
