//! Subcommand handlers

pub mod reconcile;
pub mod risk;
