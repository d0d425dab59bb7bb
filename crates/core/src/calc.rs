//! # Calc Module
//!
//! Pure decimal arithmetic for reconciliation. Every money value is a
//! `rust_decimal::Decimal` so that sums over thousands of transactions stay
//! exact and "matched" can be a strict equality test.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a bank-side transaction, as supplied by the cashier flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankTxKind {
    Deposit,
    Withdraw,
    /// Caller has already signed the amount.
    Adjustment,
}

impl BankTxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankTxKind::Deposit => "DEPOSIT",
            BankTxKind::Withdraw => "WITHDRAW",
            BankTxKind::Adjustment => "ADJUSTMENT",
        }
    }
}

impl FromStr for BankTxKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(BankTxKind::Deposit),
            "WITHDRAW" => Ok(BankTxKind::Withdraw),
            "ADJUSTMENT" => Ok(BankTxKind::Adjustment),
            other => Err(CoreError::invalid_kind("BankTxKind", other)),
        }
    }
}

impl fmt::Display for BankTxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of a provider-side transaction (credit moved in or out of a provider).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderTxKind {
    CreditIn,
    CreditOut,
    /// Caller has already signed the amount.
    Adjustment,
}

impl ProviderTxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTxKind::CreditIn => "CREDIT_IN",
            ProviderTxKind::CreditOut => "CREDIT_OUT",
            ProviderTxKind::Adjustment => "ADJUSTMENT",
        }
    }
}

impl FromStr for ProviderTxKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT_IN" => Ok(ProviderTxKind::CreditIn),
            "CREDIT_OUT" => Ok(ProviderTxKind::CreditOut),
            "ADJUSTMENT" => Ok(ProviderTxKind::Adjustment),
            other => Err(CoreError::invalid_kind("ProviderTxKind", other)),
        }
    }
}

impl fmt::Display for ProviderTxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inflow/outflow split of a list of signed amounts. Both totals are >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InOut {
    pub total_in: Decimal,
    pub total_out: Decimal,
}

impl InOut {
    /// Net flow, `total_in - total_out`.
    pub fn net(&self) -> Decimal {
        self.total_in - self.total_out
    }
}

pub fn abs(value: Decimal) -> Decimal {
    value.abs()
}

/// Sum starting from exact zero. Panics if the total leaves the `Decimal` range.
pub fn sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(Decimal::ZERO, |acc, v| acc + v)
}

/// Normalize a bank-side amount so its sign matches the direction of `kind`.
pub fn to_signed_amount(kind: BankTxKind, amount: Decimal) -> Decimal {
    match kind {
        BankTxKind::Deposit => abs(amount),
        BankTxKind::Withdraw => -abs(amount),
        BankTxKind::Adjustment => amount,
    }
}

/// Normalize a provider-side amount so its sign matches the direction of `kind`.
pub fn to_provider_signed_amount(kind: ProviderTxKind, amount: Decimal) -> Decimal {
    match kind {
        ProviderTxKind::CreditIn => abs(amount),
        ProviderTxKind::CreditOut => -abs(amount),
        ProviderTxKind::Adjustment => amount,
    }
}

/// Split signed amounts into inflow and outflow. Zero amounts land in neither.
///
/// Panics if a total leaves the `Decimal` range; see [`checked_in_out`].
pub fn calc_in_out<'a, I>(amounts: I) -> InOut
where
    I: IntoIterator<Item = &'a Decimal>,
{
    amounts
        .into_iter()
        .fold(InOut::default(), |mut acc, amount| {
            if *amount > Decimal::ZERO {
                acc.total_in += *amount;
            } else if *amount < Decimal::ZERO {
                acc.total_out += abs(*amount);
            }
            acc
        })
}

pub fn calc_expected(opening: Decimal, total_in: Decimal, total_out: Decimal) -> Decimal {
    opening + total_in - total_out
}

pub fn calc_diff(actual: Decimal, expected: Decimal) -> Decimal {
    actual - expected
}

fn overflow(figure: &str) -> CoreError {
    CoreError::ArithmeticOverflow(figure.to_string())
}

/// [`calc_in_out`] returning `ArithmeticOverflow` instead of panicking.
pub fn checked_in_out<'a, I>(amounts: I) -> CoreResult<InOut>
where
    I: IntoIterator<Item = &'a Decimal>,
{
    amounts
        .into_iter()
        .try_fold(InOut::default(), |mut acc, amount| {
            if *amount > Decimal::ZERO {
                acc.total_in = acc
                    .total_in
                    .checked_add(*amount)
                    .ok_or_else(|| overflow("total_in"))?;
            } else if *amount < Decimal::ZERO {
                acc.total_out = acc
                    .total_out
                    .checked_add(abs(*amount))
                    .ok_or_else(|| overflow("total_out"))?;
            }
            Ok(acc)
        })
}

pub fn checked_expected(
    opening: Decimal,
    total_in: Decimal,
    total_out: Decimal,
) -> CoreResult<Decimal> {
    opening
        .checked_add(total_in)
        .and_then(|v| v.checked_sub(total_out))
        .ok_or_else(|| overflow("expected"))
}

pub fn checked_diff(actual: Decimal, expected: Decimal) -> CoreResult<Decimal> {
    actual
        .checked_sub(expected)
        .ok_or_else(|| overflow("diff"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_amount_normalizes_direction() {
        assert_eq!(to_signed_amount(BankTxKind::Deposit, dec!(-25.50)), dec!(25.50));
        assert_eq!(to_signed_amount(BankTxKind::Deposit, dec!(25.50)), dec!(25.50));
        assert_eq!(to_signed_amount(BankTxKind::Withdraw, dec!(25.50)), dec!(-25.50));
        assert_eq!(to_signed_amount(BankTxKind::Withdraw, dec!(-25.50)), dec!(-25.50));
        assert_eq!(to_signed_amount(BankTxKind::Adjustment, dec!(-3)), dec!(-3));
        assert_eq!(to_signed_amount(BankTxKind::Adjustment, dec!(3)), dec!(3));
    }

    #[test]
    fn test_provider_signed_amount_normalizes_direction() {
        assert_eq!(
            to_provider_signed_amount(ProviderTxKind::CreditIn, dec!(-10)),
            dec!(10)
        );
        assert_eq!(
            to_provider_signed_amount(ProviderTxKind::CreditOut, dec!(10)),
            dec!(-10)
        );
        assert_eq!(
            to_provider_signed_amount(ProviderTxKind::Adjustment, dec!(-0.01)),
            dec!(-0.01)
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!("CREDIT_OUT".parse::<ProviderTxKind>().unwrap(), ProviderTxKind::CreditOut);
        assert_eq!("WITHDRAW".parse::<BankTxKind>().unwrap(), BankTxKind::Withdraw);
        assert_eq!(ProviderTxKind::CreditIn.to_string(), "CREDIT_IN");

        let err = "credit_in".parse::<ProviderTxKind>().unwrap_err();
        assert!(err.to_string().contains("credit_in"));
    }

    #[test]
    fn test_in_out_scenario() {
        let amounts = [dec!(50.25), dec!(-20.00), dec!(9.75)];
        let io = calc_in_out(&amounts);
        assert_eq!(io.total_in, dec!(60.00));
        assert_eq!(io.total_out, dec!(20.00));
        assert_eq!(calc_expected(dec!(1000.00), io.total_in, io.total_out), dec!(1040.00));
    }

    #[test]
    fn test_in_out_ignores_zero() {
        let amounts = [dec!(0), dec!(-0.00), dec!(5)];
        let io = calc_in_out(&amounts);
        assert_eq!(io.total_in, dec!(5));
        assert_eq!(io.total_out, Decimal::ZERO);
    }

    #[test]
    fn test_in_out_empty() {
        let io = calc_in_out(&Vec::<Decimal>::new());
        assert!(io.total_in.is_zero());
        assert!(io.total_out.is_zero());
    }

    #[test]
    fn test_in_out_balances_with_sum() {
        let samples: Vec<Vec<Decimal>> = vec![
            vec![dec!(0.1), dec!(0.2), dec!(-0.3)],
            vec![dec!(-1000000.000001), dec!(999999.999999), dec!(0.000002)],
            vec![dec!(-7), dec!(-0.5), dec!(-0.25)],
            vec![dec!(123.456789012345), dec!(-0.000000000001), dec!(0)],
            (1..=2000).map(|i| Decimal::new(if i % 3 == 0 { -i } else { i }, 2)).collect(),
        ];

        for amounts in samples {
            let io = calc_in_out(&amounts);
            assert!(io.total_in >= Decimal::ZERO);
            assert!(io.total_out >= Decimal::ZERO);
            assert_eq!(sum(amounts.iter().copied()), io.total_in - io.total_out);
            assert_eq!(io.net(), io.total_in - io.total_out);
        }
    }

    #[test]
    fn test_sum_of_tenths_is_exact() {
        // 0.1 ten times would drift in f64
        let total = sum(std::iter::repeat(dec!(0.1)).take(10));
        assert_eq!(total, dec!(1));
        assert_eq!(sum(Vec::new()), Decimal::ZERO);
    }

    #[test]
    fn test_expected_with_many_fraction_digits() {
        let opening = dec!(0.000000000000000001);
        let total_in = dec!(1.999999999999999999);
        let total_out = dec!(0.000000000000000002);
        assert_eq!(
            calc_expected(opening, total_in, total_out),
            dec!(1.999999999999999998)
        );
    }

    #[test]
    fn test_diff_zero_only_when_equal() {
        assert!(calc_diff(dec!(1040.00), dec!(1040)).is_zero());
        assert_eq!(calc_diff(dec!(1045.50), dec!(1040.00)), dec!(5.50));
        assert_eq!(calc_diff(dec!(1040.00), dec!(1040.000000001)), dec!(-0.000000001));
        assert!(!calc_diff(dec!(1040.00), dec!(1040.000000001)).is_zero());
    }

    #[test]
    fn test_checked_matches_plain() {
        let amounts = [dec!(50.25), dec!(-20.00), dec!(9.75)];
        assert_eq!(checked_in_out(&amounts).unwrap(), calc_in_out(&amounts));
        assert_eq!(
            checked_expected(dec!(1000.00), dec!(60.00), dec!(20.00)).unwrap(),
            dec!(1040.00)
        );
        assert_eq!(checked_diff(dec!(1045.50), dec!(1040.00)).unwrap(), dec!(5.50));
    }

    #[test]
    fn test_checked_overflow() {
        let err = checked_in_out(&[Decimal::MAX, dec!(1)]).unwrap_err();
        assert!(matches!(err, CoreError::ArithmeticOverflow(ref f) if f == "total_in"));

        let err = checked_in_out(&[Decimal::MIN, dec!(-1)]).unwrap_err();
        assert!(matches!(err, CoreError::ArithmeticOverflow(ref f) if f == "total_out"));

        assert!(checked_expected(Decimal::MAX, dec!(1), Decimal::ZERO).is_err());
        assert!(checked_expected(Decimal::MIN, Decimal::ZERO, dec!(1)).is_err());
        assert!(checked_diff(Decimal::MIN, dec!(1)).is_err());

        // Overflowing inflow can still be offset within range
        assert_eq!(
            checked_expected(Decimal::MAX, Decimal::ZERO, dec!(1)).unwrap(),
            Decimal::MAX - dec!(1)
        );
    }

    #[test]
    fn test_abs() {
        assert_eq!(abs(dec!(-5.5)), dec!(5.5));
        assert_eq!(abs(dec!(5.5)), dec!(5.5));
    }
}
