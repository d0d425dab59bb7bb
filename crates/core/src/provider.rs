//! # Provider Module
//!
//! External game/payment providers and the read-only data the platform keeps
//! about them: signed transaction flow and point-in-time balance snapshots.

use crate::calc::{self, ProviderTxKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An external game/payment integration.
///
/// Only active providers take part in reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProvider {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl GameProvider {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Money moved between the platform and one provider.
///
/// `amount_signed` is positive for inflow to the platform, negative for
/// outflow. Append-only; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTransaction {
    pub id: String,
    pub provider_id: String,
    pub kind: ProviderTxKind,
    pub amount_signed: Decimal,
    pub happened_at: DateTime<Utc>,
}

impl ProviderTransaction {
    /// Build a transaction, normalizing the sign of `amount` from `kind`.
    pub fn new(
        id: &str,
        provider_id: &str,
        kind: ProviderTxKind,
        amount: Decimal,
        happened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.to_string(),
            provider_id: provider_id.to_string(),
            kind,
            amount_signed: calc::to_provider_signed_amount(kind, amount),
            happened_at,
        }
    }
}

/// Provider-reported balance observed at `taken_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub id: String,
    pub provider_id: String,
    pub balance: Decimal,
    pub taken_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(id: &str, provider_id: &str, balance: Decimal, taken_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            provider_id: provider_id.to_string(),
            balance,
            taken_at,
        }
    }
}
