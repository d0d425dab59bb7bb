//! # Tally Core
//!
//! Domain types and pure calculations for provider balance reconciliation.
//!
//! ```text
//! opening (latest snapshot before day start)
//!   + total_in - total_out (day's signed provider flow)
//!   = expected
//! actual - expected = diff  ──►  OK / WARN / DANGER
//! ```

pub mod calc;
pub mod error;
pub mod provider;
pub mod reconcile;
pub mod risk;
pub mod window;

pub use calc::{BankTxKind, InOut, ProviderTxKind};
pub use error::{CoreError, CoreResult};
pub use provider::{BalanceSnapshot, GameProvider, ProviderTransaction};
pub use reconcile::{LineFigures, ReconcileLine, ReconcileSheet};
pub use risk::{
    evaluate_line, evaluate_line_risk, summarize_risks, DangerLine, LineRisk, RiskLevel,
    RiskSummary,
};
pub use window::{DayWindow, DayWindowPolicy};
