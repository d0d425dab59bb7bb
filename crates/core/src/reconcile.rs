//! # Reconcile Module
//!
//! Sheets, lines and the per-line figure computation.
//!
//! A [`ReconcileSheet`] covers one calendar date and owns one
//! [`ReconcileLine`] per provider. Everything on a line except `actual` is
//! derived by [`LineFigures::compute`].

use crate::calc;
use crate::error::CoreResult;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reconciliation unit for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSheet {
    pub id: String,
    pub sheet_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Derived figures of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineFigures {
    pub opening: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub expected: Decimal,
    /// `actual - expected`, absent until an actual balance is supplied
    pub diff: Option<Decimal>,
    pub is_matched: bool,
}

impl LineFigures {
    /// Project the expected closing balance and compare it against `actual`.
    ///
    /// `is_matched` holds only when an actual balance exists and the diff is
    /// exactly zero. Totals outside the `Decimal` range are an
    /// `ArithmeticOverflow` error.
    pub fn compute(
        opening: Decimal,
        amounts: &[Decimal],
        actual: Option<Decimal>,
    ) -> CoreResult<Self> {
        let flow = calc::checked_in_out(amounts)?;
        let expected = calc::checked_expected(opening, flow.total_in, flow.total_out)?;
        let diff = actual
            .map(|actual| calc::checked_diff(actual, expected))
            .transpose()?;

        Ok(Self {
            opening,
            total_in: flow.total_in,
            total_out: flow.total_out,
            expected,
            diff,
            is_matched: diff.is_some_and(|d| d.is_zero()),
        })
    }
}

/// One (sheet, provider) line, joined with the provider's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileLine {
    pub id: String,
    pub sheet_id: String,
    pub provider_id: String,
    pub provider_name: String,
    pub opening: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub expected: Decimal,
    pub actual: Option<Decimal>,
    pub diff: Option<Decimal>,
    pub is_matched: bool,
    pub updated_at: DateTime<Utc>,
}

impl ReconcileLine {
    pub fn figures(&self) -> LineFigures {
        LineFigures {
            opening: self.opening,
            total_in: self.total_in,
            total_out: self.total_out,
            expected: self.expected,
            diff: self.diff,
            is_matched: self.is_matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flow() -> Vec<Decimal> {
        vec![dec!(50.25), dec!(-20.00), dec!(9.75)]
    }

    #[test]
    fn test_figures_without_actual() {
        let figures = LineFigures::compute(dec!(1000.00), &flow(), None).unwrap();
        assert_eq!(figures.total_in, dec!(60.00));
        assert_eq!(figures.total_out, dec!(20.00));
        assert_eq!(figures.expected, dec!(1040.00));
        assert_eq!(figures.diff, None);
        assert!(!figures.is_matched);
    }

    #[test]
    fn test_figures_matched() {
        let figures = LineFigures::compute(dec!(1000.00), &flow(), Some(dec!(1040.00))).unwrap();
        assert_eq!(figures.diff, Some(dec!(0)));
        assert!(figures.is_matched);
    }

    #[test]
    fn test_figures_mismatch() {
        let figures = LineFigures::compute(dec!(1000.00), &flow(), Some(dec!(1045.50))).unwrap();
        assert_eq!(figures.diff, Some(dec!(5.50)));
        assert!(!figures.is_matched);
    }

    #[test]
    fn test_figures_first_day() {
        let figures = LineFigures::compute(Decimal::ZERO, &[], None).unwrap();
        assert_eq!(figures, LineFigures::default());
    }

    #[test]
    fn test_figures_overflow_is_an_error() {
        let err = LineFigures::compute(Decimal::MAX, &[dec!(1)], None).unwrap_err();
        assert!(matches!(err, crate::CoreError::ArithmeticOverflow(_)));
    }

    #[test]
    fn test_matched_ignores_scale() {
        // 1040 and 1040.000 are the same amount
        let figures = LineFigures::compute(dec!(1040), &[], Some(dec!(1040.000))).unwrap();
        assert!(figures.is_matched);
    }
}
