//! Threshold checks over a finished experiment.

use dialog_service::services::Trait;
use std::collections::BTreeMap;

use crate::experiment::{Sensitivity, E_GRADIENT};
use crate::stats;
use crate::summary::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Each gradient step must raise mean E by more than this.
    pub monotonicity_tolerance: f64,
    pub sensitivity_r2_min: f64,
    /// Allowed |slope - 1| of measured against seeded E.
    pub sensitivity_slope_tolerance: f64,
    pub unk_rate_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            monotonicity_tolerance: 0.05,
            sensitivity_r2_min: 0.85,
            sensitivity_slope_tolerance: 0.25,
            unk_rate_max: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub message: String,
}

impl CheckOutcome {
    fn pass(name: &'static str, message: String) -> Self {
        Self {
            name,
            passed: true,
            message: format!("PASS: {}", message),
        }
    }

    fn fail(name: &'static str, message: String) -> Self {
        Self {
            name,
            passed: false,
            message: format!("FAIL: {}", message),
        }
    }
}

/// Mean E must rise along E_20, E_30, E_40, E_50, averaged over runs.
pub fn check_monotonicity(rows: &[RunSummary], thresholds: &Thresholds) -> CheckOutcome {
    const NAME: &str = "E Gradient Monotonicity";

    let mut by_condition: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        if let Some(e) = row.mean(Trait::Extraversion) {
            by_condition.entry(row.condition.as_str()).or_default().push(e);
        }
    }

    let available: Vec<(&str, f64)> = E_GRADIENT
        .iter()
        .filter_map(|(condition, _)| {
            let mean = stats::mean(by_condition.get(condition)?)?;
            Some((*condition, mean))
        })
        .collect();

    if available.len() < 2 {
        return CheckOutcome::pass(NAME, "Monotonicity - Insufficient data for validation".to_string());
    }

    let violations: Vec<String> = available
        .windows(2)
        .filter(|pair| pair[1].1 <= pair[0].1 + thresholds.monotonicity_tolerance)
        .map(|pair| format!("{}({:.3}) >= {}({:.3})", pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .collect();

    if !violations.is_empty() {
        return CheckOutcome::fail(NAME, format!("Monotonicity violation - {}", violations.join(", ")));
    }

    let chain: Vec<String> = available
        .iter()
        .map(|(condition, mean)| format!("{}({:.3})", condition, mean))
        .collect();
    CheckOutcome::pass(NAME, format!("Monotonicity OK - {}", chain.join(" < ")))
}

pub fn check_unk_rates(rows: &[RunSummary], thresholds: &Thresholds) -> CheckOutcome {
    const NAME: &str = "UNK Rate Validation";

    let high: Vec<String> = rows
        .iter()
        .filter(|row| row.unk_rate > thresholds.unk_rate_max)
        .map(|row| format!("{} ({:.3})", row.condition, row.unk_rate))
        .collect();

    if !high.is_empty() {
        return CheckOutcome::fail(
            NAME,
            format!("High UNK rate - {} > {}", high.join(", "), thresholds.unk_rate_max),
        );
    }

    let max = rows.iter().map(|row| row.unk_rate).fold(0.0, f64::max);
    CheckOutcome::pass(NAME, format!("UNK rates acceptable (max {:.3})", max))
}

pub fn check_sensitivity(sensitivity: Option<&Sensitivity>, thresholds: &Thresholds) -> CheckOutcome {
    const NAME: &str = "Sensitivity Analysis";

    let Some(sensitivity) = sensitivity else {
        return CheckOutcome::fail(NAME, "sensitivity_E_grad.json file not found".to_string());
    };
    let (Some(slope), Some(r2)) = (sensitivity.slope, sensitivity.r_squared) else {
        return CheckOutcome::fail(NAME, "Sensitivity analysis - no fit (too few gradient runs)".to_string());
    };

    let mut issues = Vec::new();
    if r2 < thresholds.sensitivity_r2_min {
        issues.push(format!("R²={:.3} < {}", r2, thresholds.sensitivity_r2_min));
    }
    let deviation = (slope - 1.0).abs();
    if deviation > thresholds.sensitivity_slope_tolerance {
        issues.push(format!(
            "|slope-1|={:.3} > {}",
            deviation, thresholds.sensitivity_slope_tolerance
        ));
    }

    if issues.is_empty() {
        CheckOutcome::pass(NAME, format!("Sensitivity analysis OK (R²={:.3}, slope={:.3})", r2, slope))
    } else {
        CheckOutcome::fail(NAME, format!("Sensitivity analysis - {}", issues.join(", ")))
    }
}

pub fn run_checks(
    rows: &[RunSummary],
    sensitivity: Option<&Sensitivity>,
    thresholds: &Thresholds,
) -> Vec<CheckOutcome> {
    vec![
        check_monotonicity(rows, thresholds),
        check_unk_rates(rows, thresholds),
        check_sensitivity(sensitivity, thresholds),
    ]
}
