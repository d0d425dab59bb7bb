//! # Risk Module
//!
//! Maps a line's diff onto an operational severity and aggregates per-sheet
//! risk for alerting. Pure functions; the threshold is always passed in.

use crate::calc;
use crate::error::CoreError;
use crate::reconcile::ReconcileLine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a reconciliation discrepancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// `|diff| == 0`, or no actual balance yet
    Ok,
    /// `0 < |diff| <= threshold`
    Warn,
    /// `|diff| > threshold`
    Danger,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Ok => "OK",
            RiskLevel::Warn => "WARN",
            RiskLevel::Danger => "DANGER",
        }
    }

    pub fn classify(abs_diff: Decimal, threshold: Decimal) -> Self {
        if abs_diff.is_zero() {
            RiskLevel::Ok
        } else if abs_diff <= threshold {
            RiskLevel::Warn
        } else {
            RiskLevel::Danger
        }
    }
}

impl FromStr for RiskLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(RiskLevel::Ok),
            "WARN" => Ok(RiskLevel::Warn),
            "DANGER" => Ok(RiskLevel::Danger),
            other => Err(CoreError::InvalidRiskLevel(other.to_string())),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Risk verdict for one line, with the inputs used for audit/display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRisk {
    pub level: RiskLevel,
    pub reason: String,
    pub threshold: Decimal,
    pub abs_diff: Decimal,
}

/// A DANGER line, as listed in [`RiskSummary::danger_lines`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerLine {
    pub provider_id: String,
    pub provider_name: String,
    pub diff: Decimal,
}

/// Per-sheet risk aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub threshold: Decimal,
    pub warn_count: usize,
    pub danger_count: usize,
    pub danger_lines: Vec<DangerLine>,
}

impl RiskSummary {
    pub fn has_danger(&self) -> bool {
        self.danger_count > 0
    }
}

/// Classify a diff against `threshold`. An absent diff counts as zero.
pub fn evaluate_line_risk(diff: Option<Decimal>, threshold: Decimal) -> LineRisk {
    let abs_diff = calc::abs(diff.unwrap_or(Decimal::ZERO));
    let level = RiskLevel::classify(abs_diff, threshold);

    let reason = match (level, diff) {
        (RiskLevel::Ok, None) => "No actual balance yet".to_string(),
        (RiskLevel::Ok, Some(_)) => "Actual balance matches expected".to_string(),
        (RiskLevel::Warn, _) => format!("|diff| {} is within threshold {}", abs_diff, threshold),
        (RiskLevel::Danger, _) => format!("|diff| {} exceeds threshold {}", abs_diff, threshold),
    };

    LineRisk {
        level,
        reason,
        threshold,
        abs_diff,
    }
}

pub fn evaluate_line(line: &ReconcileLine, threshold: Decimal) -> LineRisk {
    evaluate_line_risk(line.diff, threshold)
}

/// Aggregate WARN/DANGER counts and list every DANGER line, in input order.
pub fn summarize_risks(lines: &[ReconcileLine], threshold: Decimal) -> RiskSummary {
    let mut summary = RiskSummary {
        threshold,
        warn_count: 0,
        danger_count: 0,
        danger_lines: Vec::new(),
    };

    for line in lines {
        match evaluate_line(line, threshold).level {
            RiskLevel::Ok => {}
            RiskLevel::Warn => summary.warn_count += 1,
            RiskLevel::Danger => {
                summary.danger_count += 1;
                summary.danger_lines.push(DangerLine {
                    provider_id: line.provider_id.clone(),
                    provider_name: line.provider_name.clone(),
                    diff: line.diff.unwrap_or(Decimal::ZERO),
                });
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn line(provider_id: &str, diff: Option<Decimal>) -> ReconcileLine {
        ReconcileLine {
            id: format!("L_{}", provider_id),
            sheet_id: "S1".to_string(),
            provider_id: provider_id.to_string(),
            provider_name: format!("{} Games", provider_id),
            opening: Decimal::ZERO,
            total_in: Decimal::ZERO,
            total_out: Decimal::ZERO,
            expected: Decimal::ZERO,
            actual: diff,
            diff,
            is_matched: diff.is_some_and(|d| d.is_zero()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_levels() {
        assert_eq!(evaluate_line_risk(Some(dec!(0)), dec!(10)).level, RiskLevel::Ok);
        assert_eq!(evaluate_line_risk(Some(dec!(5.50)), dec!(10)).level, RiskLevel::Warn);
        assert_eq!(evaluate_line_risk(Some(dec!(-5.50)), dec!(10)).level, RiskLevel::Warn);
        assert_eq!(evaluate_line_risk(Some(dec!(5.50)), dec!(5)).level, RiskLevel::Danger);
        assert_eq!(evaluate_line_risk(Some(dec!(-5.50)), dec!(5)).level, RiskLevel::Danger);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(evaluate_line_risk(Some(dec!(10)), dec!(10)).level, RiskLevel::Warn);
        assert_eq!(
            evaluate_line_risk(Some(dec!(10.000001)), dec!(10)).level,
            RiskLevel::Danger
        );
    }

    #[test]
    fn test_zero_threshold() {
        assert_eq!(evaluate_line_risk(Some(dec!(0.01)), dec!(0)).level, RiskLevel::Danger);
        assert_eq!(evaluate_line_risk(Some(dec!(0)), dec!(0)).level, RiskLevel::Ok);
    }

    #[test]
    fn test_absent_diff_is_ok() {
        let risk = evaluate_line_risk(None, dec!(10));
        assert_eq!(risk.level, RiskLevel::Ok);
        assert_eq!(risk.abs_diff, Decimal::ZERO);
        assert_eq!(risk.threshold, dec!(10));
        assert!(risk.reason.contains("No actual"));
    }

    #[test]
    fn test_reason_mentions_inputs() {
        let risk = evaluate_line_risk(Some(dec!(-5.50)), dec!(5));
        assert_eq!(risk.abs_diff, dec!(5.50));
        assert!(risk.reason.contains("5.50"));
        assert!(risk.reason.contains("exceeds"));
    }

    #[test]
    fn test_summarize() {
        let lines = vec![
            line("A", None),
            line("B", Some(dec!(0))),
            line("C", Some(dec!(3))),
            line("D", Some(dec!(-12.5))),
            line("E", Some(dec!(10))),
            line("F", Some(dec!(250))),
        ];

        let summary = summarize_risks(&lines, dec!(10));
        assert_eq!(summary.threshold, dec!(10));
        assert_eq!(summary.warn_count, 2);
        assert_eq!(summary.danger_count, 2);
        assert!(summary.has_danger());

        let ids: Vec<&str> = summary
            .danger_lines
            .iter()
            .map(|d| d.provider_id.as_str())
            .collect();
        assert_eq!(ids, vec!["D", "F"]);
        assert_eq!(summary.danger_lines[0].diff, dec!(-12.5));
        assert_eq!(summary.danger_lines[0].provider_name, "D Games");
    }

    #[test]
    fn test_summarize_counts_match_levels() {
        let lines: Vec<ReconcileLine> = (0..40)
            .map(|i| line(&format!("P{:02}", i), Some(Decimal::new(i * 37 - 700, 2))))
            .collect();
        let threshold = dec!(3.25);

        let summary = summarize_risks(&lines, threshold);
        let levels: Vec<RiskLevel> = lines
            .iter()
            .map(|l| evaluate_line(l, threshold).level)
            .collect();

        assert_eq!(
            summary.warn_count,
            levels.iter().filter(|l| **l == RiskLevel::Warn).count()
        );
        assert_eq!(
            summary.danger_count,
            levels.iter().filter(|l| **l == RiskLevel::Danger).count()
        );
        assert_eq!(summary.danger_lines.len(), summary.danger_count);
        assert_eq!(summary, summarize_risks(&lines, threshold));
    }

    #[test]
    fn test_empty_sheet() {
        let summary = summarize_risks(&[], dec!(1));
        assert_eq!(summary.warn_count, 0);
        assert!(!summary.has_danger());
        assert!(summary.danger_lines.is_empty());
    }

    #[test]
    fn test_level_names() {
        assert_eq!("DANGER".parse::<RiskLevel>().unwrap(), RiskLevel::Danger);
        assert_eq!(RiskLevel::Warn.to_string(), "WARN");
        assert!("warn".parse::<RiskLevel>().is_err());
    }
}
