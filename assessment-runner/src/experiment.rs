//! Experiment matrix: every condition under every model seed and item order.
//!
//! Each condition is a preset persona seeded under a user id of the same
//! name. Runs land in `runs/<condition>/<tag>.{json,md}` and one row per run
//! is appended to `runs/summary.csv`. Trait leakage is measured against the
//! `NEUTRAL` run with the same seed and order; the E gradient conditions feed
//! a linear fit written to `runs/sensitivity_E_grad.json`.

use dialog_service::services::{PersonaClient, Trait};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregator::{aggregate, Aggregate};
use crate::error::AssessmentError;
use crate::inventory::InventoryItem;
use crate::report::render_report;
use crate::runner::{MpiRunner, RunOptions, RunResults};
use crate::seed::{preset, seed_persona, PRESETS};
use crate::stats;

pub const BASELINE: &str = "NEUTRAL";
pub const DEFAULT_SEEDS: [i64; 3] = [111, 222, 333];
pub const DEFAULT_ORDER_SEEDS: [Option<u64>; 2] = [None, Some(7)];
pub const SUMMARY_FILE: &str = "summary.csv";
pub const SENSITIVITY_FILE: &str = "sensitivity_E_grad.json";

/// E gradient conditions and the extraversion score each one seeds.
pub const E_GRADIENT: [(&str, f64); 4] = [("E_20", 2.0), ("E_30", 3.0), ("E_40", 4.0), ("E_50", 5.0)];

/// The gradient fit reads the unshuffled runs of this seed.
const SENSITIVITY_SEED: i64 = 111;

/// Trait a condition manipulates, if any.
pub fn condition_target(condition: &str) -> Option<Trait> {
    match condition.to_ascii_uppercase().as_str() {
        "E_HIGH" | "E_20" | "E_30" | "E_40" | "E_50" => Some(Trait::Extraversion),
        "C_HIGH" => Some(Trait::Conscientiousness),
        "N_LOW" => Some(Trait::Neuroticism),
        _ => None,
    }
}

/// One cell of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub condition: String,
    pub seed: i64,
    pub order_seed: Option<u64>,
}

impl RunKey {
    /// File stem, e.g. `NEUTRAL__seed-111__order-None`.
    pub fn tag(&self) -> String {
        format!(
            "{}__seed-{}__order-{}",
            self.condition,
            self.seed,
            order_label(self.order_seed)
        )
    }

    pub fn from_tag(stem: &str) -> Option<Self> {
        let mut parts = stem.split("__");
        let condition = parts.next().filter(|c| !c.is_empty())?.to_string();

        let mut seed = None;
        let mut order_seed = None;
        for part in parts {
            if let Some(raw) = part.strip_prefix("seed-") {
                seed = raw.parse().ok();
            } else if let Some(raw) = part.strip_prefix("order-") {
                order_seed = match raw {
                    "None" => None,
                    other => Some(other.parse().ok()?),
                };
            }
        }

        Some(Self {
            condition,
            seed: seed?,
            order_seed,
        })
    }

    pub fn results_path(&self, runs_dir: &Path) -> PathBuf {
        runs_dir.join(&self.condition).join(format!("{}.json", self.tag()))
    }

    pub fn report_path(&self, runs_dir: &Path) -> PathBuf {
        runs_dir.join(&self.condition).join(format!("{}.md", self.tag()))
    }
}

pub fn order_label(order_seed: Option<u64>) -> String {
    order_seed.map_or_else(|| "None".to_string(), |o| o.to_string())
}

#[derive(Debug, Clone)]
pub struct ExperimentPlan {
    pub conditions: Vec<String>,
    pub seeds: Vec<i64>,
    pub order_seeds: Vec<Option<u64>>,
}

impl Default for ExperimentPlan {
    fn default() -> Self {
        Self {
            conditions: PRESETS.iter().map(|(name, _)| name.to_string()).collect(),
            seeds: DEFAULT_SEEDS.to_vec(),
            order_seeds: DEFAULT_ORDER_SEEDS.to_vec(),
        }
    }
}

impl ExperimentPlan {
    /// One NEUTRAL run with seed 111 in inventory order.
    pub fn quick() -> Self {
        Self {
            conditions: vec![BASELINE.to_string()],
            seeds: vec![SENSITIVITY_SEED],
            order_seeds: vec![None],
        }
    }

    /// Upper-cased conditions, baseline first so every later run has one to compare against.
    pub fn ordered_conditions(&self) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.conditions.len());
        if self.conditions.iter().any(|c| c.eq_ignore_ascii_case(BASELINE)) {
            ordered.push(BASELINE.to_string());
        }
        for condition in &self.conditions {
            let condition = condition.to_ascii_uppercase();
            if condition != BASELINE && !ordered.contains(&condition) {
                ordered.push(condition);
            }
        }
        ordered
    }

    pub fn run_count(&self) -> usize {
        self.ordered_conditions().len() * self.seeds.len() * self.order_seeds.len()
    }
}

/// Mean absolute shift of the non-target traits away from the baseline.
///
/// Conditions without a target trait have no leakage. Traits missing on
/// either side are left out; with none left the result is `None`.
pub fn compute_leakage(
    means: &BTreeMap<Trait, Option<f64>>,
    baseline: &BTreeMap<Trait, Option<f64>>,
    target: Option<Trait>,
) -> Option<f64> {
    let target = target?;
    let deltas: Vec<f64> = Trait::ALL
        .into_iter()
        .filter(|t| *t != target)
        .filter_map(|t| {
            let measured = means.get(&t).copied().flatten()?;
            let base = baseline.get(&t).copied().flatten()?;
            Some((measured - base).abs())
        })
        .collect();
    stats::mean(&deltas)
}

/// A row of `summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub condition: String,
    pub user_id: String,
    pub seed: i64,
    pub order_seed: String,
    pub target: String,
    #[serde(rename = "mean_O")]
    pub mean_o: Option<f64>,
    #[serde(rename = "mean_C")]
    pub mean_c: Option<f64>,
    #[serde(rename = "mean_E")]
    pub mean_e: Option<f64>,
    #[serde(rename = "mean_A")]
    pub mean_a: Option<f64>,
    #[serde(rename = "mean_N")]
    pub mean_n: Option<f64>,
    #[serde(rename = "persona_O")]
    pub persona_o: f64,
    #[serde(rename = "persona_C")]
    pub persona_c: f64,
    #[serde(rename = "persona_E")]
    pub persona_e: f64,
    #[serde(rename = "persona_A")]
    pub persona_a: f64,
    #[serde(rename = "persona_N")]
    pub persona_n: f64,
    pub correlation: Option<f64>,
    #[serde(rename = "MAE")]
    pub mae: Option<f64>,
    #[serde(rename = "RMSE")]
    pub rmse: Option<f64>,
    #[serde(rename = "leakage_vs_NEUTRAL")]
    pub leakage: Option<f64>,
    pub valid_rate: f64,
    pub unk_count: usize,
    pub extreme_bias: f64,
    pub consistency_std: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub total_tokens: u64,
    pub results_path: String,
    pub report_path: String,
}

impl SummaryRow {
    pub fn build(
        key: &RunKey,
        data: &RunResults,
        agg: &Aggregate,
        snapshot: &BTreeMap<Trait, f64>,
        leakage: Option<f64>,
        runs_dir: &Path,
    ) -> Self {
        let comparison = agg.compare_with_persona(snapshot);
        let means = agg.means();
        let mean = |t: Trait| means.get(&t).copied().flatten();
        let persona = |t: Trait| snapshot.get(&t).copied().unwrap_or_default();
        let latencies: Vec<f64> = data.results.iter().map(|r| r.latency_ms as f64).collect();

        Self {
            condition: key.condition.clone(),
            user_id: data.user_id.clone(),
            seed: key.seed,
            order_seed: order_label(key.order_seed),
            target: condition_target(&key.condition)
                .map_or_else(|| "None".to_string(), |t| t.code().to_string()),
            mean_o: mean(Trait::Openness),
            mean_c: mean(Trait::Conscientiousness),
            mean_e: mean(Trait::Extraversion),
            mean_a: mean(Trait::Agreeableness),
            mean_n: mean(Trait::Neuroticism),
            persona_o: persona(Trait::Openness),
            persona_c: persona(Trait::Conscientiousness),
            persona_e: persona(Trait::Extraversion),
            persona_a: persona(Trait::Agreeableness),
            persona_n: persona(Trait::Neuroticism),
            correlation: comparison.overall_metrics.correlation,
            mae: comparison.overall_metrics.mean_absolute_error,
            rmse: comparison.overall_metrics.root_mean_square_error,
            leakage,
            valid_rate: agg.metadata.completion_rate,
            unk_count: agg.metadata.unk_items,
            extreme_bias: agg.quality_metrics.extreme_response_bias,
            consistency_std: agg.quality_metrics.avg_within_trait_consistency,
            avg_latency_ms: stats::mean(&latencies),
            total_tokens: data
                .results
                .iter()
                .map(|r| u64::from(r.prompt_tokens) + u64::from(r.completion_tokens))
                .sum(),
            results_path: key.results_path(runs_dir).display().to_string(),
            report_path: key.report_path(runs_dir).display().to_string(),
        }
    }
}

/// Append one row, writing the header when the file is new or empty.
pub fn append_summary(path: &Path, row: &SummaryRow) -> Result<(), AssessmentError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AssessmentError::io(parent, e))?;
    }
    let write_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AssessmentError::io(path, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush().map_err(|e| AssessmentError::io(path, e))?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPair {
    pub condition: String,
    pub target: f64,
    pub measured: Option<f64>,
}

/// Measured extraversion against the seeded value across the E gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    pub target_trait: String,
    pub pairs: Vec<SensitivityPair>,
    pub slope: Option<f64>,
    #[serde(alias = "r2")]
    pub r_squared: Option<f64>,
}

impl Sensitivity {
    pub fn from_pairs(pairs: Vec<SensitivityPair>) -> Self {
        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs
            .iter()
            .filter_map(|p| Some((p.target, p.measured?)))
            .unzip();
        let fit = stats::linear_fit(&xs, &ys);

        Self {
            target_trait: Trait::Extraversion.code().to_string(),
            pairs,
            slope: fit.map(|f| f.slope),
            r_squared: fit.and_then(|f| f.r_squared),
        }
    }

    pub fn load(path: &Path) -> Result<Self, AssessmentError> {
        let raw = std::fs::read_to_string(path).map_err(|e| AssessmentError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), AssessmentError> {
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body).map_err(|e| AssessmentError::io(path, e))
    }
}

/// Fit the E gradient from the unshuffled seed-111 runs under `runs_dir`.
/// Conditions without a results file are skipped.
pub fn e_gradient_sensitivity(runs_dir: &Path) -> Result<Sensitivity, AssessmentError> {
    let mut pairs = Vec::with_capacity(E_GRADIENT.len());

    for (condition, target) in E_GRADIENT {
        let key = RunKey {
            condition: condition.to_string(),
            seed: SENSITIVITY_SEED,
            order_seed: None,
        };
        let path = key.results_path(runs_dir);
        if !path.exists() {
            tracing::warn!(path = %path.display(), "No gradient run, skipping");
            continue;
        }

        let measured = aggregate(&RunResults::load(&path)?)
            .trait_summary
            .get(&Trait::Extraversion)
            .and_then(|s| s.mean);
        tracing::info!(condition, target, measured = ?measured, "Gradient point");
        pairs.push(SensitivityPair {
            condition: condition.to_string(),
            target,
            measured,
        });
    }

    Ok(Sensitivity::from_pairs(pairs))
}

#[derive(Debug)]
pub struct ExperimentOutcome {
    pub rows: Vec<SummaryRow>,
    pub sensitivity: Sensitivity,
}

pub struct Experiment {
    pub persona: PersonaClient,
    pub dialog_url: String,
    pub items: Vec<InventoryItem>,
    pub runs_dir: PathBuf,
    /// Strictness, format and pacing; seed and order come from the plan.
    pub options: RunOptions,
    pub timeout: Duration,
}

impl Experiment {
    pub async fn run(&self, plan: &ExperimentPlan) -> Result<ExperimentOutcome, AssessmentError> {
        std::fs::create_dir_all(&self.runs_dir).map_err(|e| AssessmentError::io(&self.runs_dir, e))?;
        let summary_path = self.runs_dir.join(SUMMARY_FILE);
        let mut baselines: HashMap<(i64, Option<u64>), BTreeMap<Trait, Option<f64>>> = HashMap::new();
        let mut rows = Vec::with_capacity(plan.run_count());

        tracing::info!(
            runs = plan.run_count(),
            dialog = %self.dialog_url,
            runs_dir = %self.runs_dir.display(),
            "Starting experiment"
        );

        for condition in plan.ordered_conditions() {
            let profile = preset(&condition).ok_or_else(|| {
                AssessmentError::InvalidInput(format!("unknown condition '{}'", condition))
            })?;
            let stored = seed_persona(&self.persona, &condition, &profile).await?;
            let snapshot: BTreeMap<Trait, f64> =
                Trait::ALL.into_iter().map(|t| (t, stored.score(t))).collect();
            let runner = MpiRunner::new(&self.dialog_url, &condition, self.timeout)?;

            for &seed in &plan.seeds {
                for &order_seed in &plan.order_seeds {
                    let key = RunKey {
                        condition: condition.clone(),
                        seed,
                        order_seed,
                    };
                    let options = RunOptions {
                        seed: Some(seed),
                        order_seed,
                        ..self.options.clone()
                    };

                    let data = RunResults::new(&condition, runner.run(&self.items, &options).await);
                    data.save(key.results_path(&self.runs_dir))?;

                    let agg = aggregate(&data);
                    let comparison = agg.compare_with_persona(&snapshot);
                    let report_path = key.report_path(&self.runs_dir);
                    std::fs::write(&report_path, render_report(&agg, Some(&comparison)))
                        .map_err(|e| AssessmentError::io(&report_path, e))?;

                    let means = agg.means();
                    let leakage = if condition == BASELINE {
                        baselines.insert((seed, order_seed), means);
                        None
                    } else {
                        baselines
                            .get(&(seed, order_seed))
                            .and_then(|base| compute_leakage(&means, base, condition_target(&condition)))
                    };

                    let row = SummaryRow::build(&key, &data, &agg, &snapshot, leakage, &self.runs_dir);
                    append_summary(&summary_path, &row)?;
                    tracing::info!(
                        tag = %key.tag(),
                        correlation = ?row.correlation,
                        mae = ?row.mae,
                        leakage = ?row.leakage,
                        "Run complete"
                    );
                    rows.push(row);
                }
            }
        }

        let sensitivity = e_gradient_sensitivity(&self.runs_dir)?;
        sensitivity.save(&self.runs_dir.join(SENSITIVITY_FILE))?;

        Ok(ExperimentOutcome { rows, sensitivity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn means(values: [Option<f64>; 5]) -> BTreeMap<Trait, Option<f64>> {
        Trait::ALL.into_iter().zip(values).collect()
    }

    #[test]
    fn leakage_averages_non_target_shifts() {
        let baseline = means([Some(3.0), Some(3.0), Some(3.0), Some(3.0), Some(3.0)]);
        let shifted = means([Some(3.5), Some(2.5), Some(5.0), Some(3.0), Some(4.0)]);

        let leakage = compute_leakage(&shifted, &baseline, Some(Trait::Extraversion)).unwrap();
        // |0.5| + |-0.5| + 0 + |1.0| over four traits
        assert!((leakage - 0.5).abs() < 1e-9);
    }

    #[test]
    fn leakage_skips_missing_traits_and_untargeted_conditions() {
        let baseline = means([Some(3.0), None, Some(3.0), Some(3.0), Some(3.0)]);
        let shifted = means([Some(4.0), Some(1.0), Some(5.0), None, Some(3.0)]);

        let leakage = compute_leakage(&shifted, &baseline, Some(Trait::Extraversion)).unwrap();
        assert!((leakage - 0.5).abs() < 1e-9);

        assert_eq!(compute_leakage(&shifted, &baseline, None), None);

        let empty = means([None; 5]);
        assert_eq!(compute_leakage(&empty, &baseline, Some(Trait::Openness)), None);
    }

    #[test]
    fn tags_round_trip() {
        let key = RunKey {
            condition: "E_HIGH".to_string(),
            seed: 222,
            order_seed: Some(7),
        };
        assert_eq!(key.tag(), "E_HIGH__seed-222__order-7");
        assert_eq!(RunKey::from_tag(&key.tag()), Some(key));

        let unordered = RunKey::from_tag("NEUTRAL__seed-111__order-None").unwrap();
        assert_eq!(unordered.order_seed, None);
        assert_eq!(RunKey::from_tag("quick_test_seed_111"), None);
    }

    #[test]
    fn baseline_runs_first() {
        let plan = ExperimentPlan {
            conditions: vec!["E_HIGH".to_string(), "neutral".to_string(), "N_LOW".to_string()],
            seeds: vec![1, 2],
            order_seeds: vec![None],
        };
        assert_eq!(plan.ordered_conditions(), vec!["NEUTRAL", "E_HIGH", "N_LOW"]);
        assert_eq!(plan.run_count(), 6);

        let full = ExperimentPlan::default();
        assert_eq!(full.ordered_conditions()[0], BASELINE);
        assert_eq!(full.run_count(), 9 * 3 * 2);
    }

    #[test]
    fn targets_follow_condition_names() {
        assert_eq!(condition_target("E_40"), Some(Trait::Extraversion));
        assert_eq!(condition_target("c_high"), Some(Trait::Conscientiousness));
        assert_eq!(condition_target("N_LOW"), Some(Trait::Neuroticism));
        assert_eq!(condition_target("NEUTRAL"), None);
        assert_eq!(condition_target("TEST_USER"), None);
    }

    #[test]
    fn sensitivity_fits_measured_points_only() {
        let pair = |condition: &str, target: f64, measured: Option<f64>| SensitivityPair {
            condition: condition.to_string(),
            target,
            measured,
        };
        let sensitivity = Sensitivity::from_pairs(vec![
            pair("E_20", 2.0, Some(2.2)),
            pair("E_30", 3.0, Some(3.2)),
            pair("E_40", 4.0, None),
            pair("E_50", 5.0, Some(5.2)),
        ]);

        assert!((sensitivity.slope.unwrap() - 1.0).abs() < 1e-9);
        assert!((sensitivity.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(sensitivity.pairs.len(), 4);
    }

    #[test]
    fn sensitivity_reads_r2_alias() {
        let parsed: Sensitivity = serde_json::from_str(
            r#"{"target_trait": "E", "pairs": [], "slope": 0.9, "r2": 0.95}"#,
        )
        .unwrap();
        assert_eq!(parsed.r_squared, Some(0.95));
    }

    #[test]
    fn summary_header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join(SUMMARY_FILE);
        let key = RunKey {
            condition: "NEUTRAL".to_string(),
            seed: 111,
            order_seed: None,
        };
        let data = RunResults::new("NEUTRAL", Vec::new());
        let agg = aggregate(&data);
        let snapshot: BTreeMap<Trait, f64> = Trait::ALL.into_iter().map(|t| (t, 3.0)).collect();
        let row = SummaryRow::build(&key, &data, &agg, &snapshot, None, dir.path());

        append_summary(&path, &row).unwrap();
        append_summary(&path, &row).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("condition,user_id,seed,order_seed,target,mean_O,"));
        assert!(lines[0].contains(",leakage_vs_NEUTRAL,"));
        assert!(lines[1].starts_with("NEUTRAL,NEUTRAL,111,None,None,,"));
    }
}
