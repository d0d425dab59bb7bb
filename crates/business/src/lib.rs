//! # Tally Business
//!
//! Business logic layer - daily sheet reconciliation and risk reporting.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod risk;
pub mod services;

pub use config::ReconConfig;
pub use error::{BusinessError, BusinessResult};
pub use reconcile::ReconcileService;
pub use risk::{RiskService, DIFF_THRESHOLD_KEY};
pub use services::{DayReconciliation, ServiceContext};
