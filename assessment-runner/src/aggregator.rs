//! Scores assessment results per trait and compares them with a persona.

use dialog_service::eval::Choice;
use dialog_service::services::{Persona, Trait};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::runner::RunResults;
use crate::stats;

/// Highest Likert score; reverse-keyed items score `REVERSE_BASE - s`.
const REVERSE_BASE: u8 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub user_id: String,
    pub timestamp: f64,
    pub total_items: usize,
    pub valid_items: usize,
    pub unk_items: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraitSummary {
    pub code: char,
    pub trait_name: &'static str,
    pub n_items: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    pub scores: Vec<f64>,
}

impl TraitSummary {
    fn new(t: Trait, scores: Vec<f64>) -> Self {
        Self {
            code: t.code(),
            trait_name: t.name(),
            n_items: scores.len(),
            mean: stats::mean(&scores),
            std: stats::sample_std(&scores),
            min: stats::min(&scores),
            max: stats::max(&scores),
            median: stats::median(&scores),
            scores,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalysis {
    pub index: usize,
    pub label_raw: String,
    pub trait_code: String,
    pub trait_name: &'static str,
    pub item_text: String,
    pub choice: Choice,
    pub raw_score: u8,
    pub key: i32,
    pub final_score: u8,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnknownItem {
    pub index: usize,
    pub label_raw: String,
    pub raw_output: String,
    pub item_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityMetrics {
    /// Share of each letter among valid answers.
    pub choice_distribution: BTreeMap<Choice, f64>,
    /// (A + E) / valid answers.
    pub extreme_response_bias: f64,
    /// Mean of the per-trait standard deviations.
    pub avg_within_trait_consistency: Option<f64>,
    /// Sample standard deviation of the five letter counts.
    pub response_variability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    pub metadata: Metadata,
    pub choice_counts: BTreeMap<Choice, usize>,
    pub trait_summary: BTreeMap<Trait, TraitSummary>,
    pub item_analysis: Vec<ItemAnalysis>,
    pub unk_items: Vec<UnknownItem>,
    pub quality_metrics: QualityMetrics,
}

/// Likert score after reverse keying.
pub fn item_score(choice: Choice, key: i32) -> Option<u8> {
    let score = choice.score()?;
    Some(if key != 1 { REVERSE_BASE - score } else { score })
}

pub fn aggregate(data: &RunResults) -> Aggregate {
    let mut scores: BTreeMap<Trait, Vec<f64>> = Trait::ALL.into_iter().map(|t| (t, Vec::new())).collect();
    let mut choice_counts: BTreeMap<Choice, usize> = Choice::ANSWERS
        .into_iter()
        .chain(std::iter::once(Choice::Unknown))
        .map(|c| (c, 0))
        .collect();
    let mut item_analysis = Vec::new();
    let mut unk_items = Vec::new();

    for (index, result) in data.results.iter().enumerate() {
        let choice = result.parsed_choice;
        *choice_counts.entry(choice).or_default() += 1;

        let (Some(raw_score), Some(final_score)) =
            (choice.score(), item_score(choice, result.key))
        else {
            unk_items.push(UnknownItem {
                index,
                label_raw: result.label_raw.clone(),
                raw_output: result.raw_output.clone(),
                item_text: result.item_text.clone(),
            });
            continue;
        };

        let t = Trait::from_code(&result.label_ocean);
        if let Some(t) = t {
            scores.entry(t).or_default().push(f64::from(final_score));
        }

        item_analysis.push(ItemAnalysis {
            index,
            label_raw: result.label_raw.clone(),
            trait_code: result.label_ocean.clone(),
            trait_name: t.map(|t| t.name()).unwrap_or("unknown"),
            item_text: result.item_text.clone(),
            choice,
            raw_score,
            key: result.key,
            final_score,
            latency_ms: result.latency_ms,
        });
    }

    let trait_summary: BTreeMap<Trait, TraitSummary> = scores
        .into_iter()
        .map(|(t, s)| (t, TraitSummary::new(t, s)))
        .collect();

    let total_items = data.results.len();
    let valid_items: usize = trait_summary.values().map(|s| s.n_items).sum();
    let quality_metrics = quality_metrics(&choice_counts, &trait_summary);

    Aggregate {
        metadata: Metadata {
            user_id: data.user_id.clone(),
            timestamp: data.timestamp,
            total_items,
            valid_items,
            unk_items: unk_items.len(),
            completion_rate: if total_items > 0 {
                valid_items as f64 / total_items as f64
            } else {
                0.0
            },
        },
        choice_counts,
        trait_summary,
        item_analysis,
        unk_items,
        quality_metrics,
    }
}

fn quality_metrics(
    choice_counts: &BTreeMap<Choice, usize>,
    trait_summary: &BTreeMap<Trait, TraitSummary>,
) -> QualityMetrics {
    let count = |c: Choice| choice_counts.get(&c).copied().unwrap_or(0);
    let total_valid: usize = Choice::ANSWERS.into_iter().map(count).sum();

    if total_valid == 0 {
        return QualityMetrics {
            choice_distribution: BTreeMap::new(),
            extreme_response_bias: 0.0,
            avg_within_trait_consistency: None,
            response_variability: 0.0,
        };
    }

    let valid = total_valid as f64;
    let stds: Vec<f64> = trait_summary.values().filter_map(|s| s.std).collect();
    let counts: Vec<f64> = Choice::ANSWERS.into_iter().map(|c| count(c) as f64).collect();

    QualityMetrics {
        choice_distribution: Choice::ANSWERS
            .into_iter()
            .map(|c| (c, count(c) as f64 / valid))
            .collect(),
        extreme_response_bias: (count(Choice::A) + count(Choice::E)) as f64 / valid,
        avg_within_trait_consistency: stats::mean(&stds),
        response_variability: stats::sample_std(&counts).unwrap_or(0.0),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraitComparison {
    pub trait_name: &'static str,
    pub persona_value: f64,
    pub measured_value: f64,
    pub error: f64,
    pub abs_error: f64,
    /// Absent when the persona value is 0.
    pub relative_error: Option<f64>,
    pub n_items: usize,
    pub std: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallMetrics {
    pub correlation: Option<f64>,
    pub mean_absolute_error: Option<f64>,
    pub root_mean_square_error: Option<f64>,
    pub traits_compared: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonaComparison {
    pub persona_snapshot: BTreeMap<Trait, f64>,
    pub trait_comparisons: BTreeMap<Trait, TraitComparison>,
    pub overall_metrics: OverallMetrics,
}

/// Read a persona snapshot keyed by OCEAN codes or by trait names.
///
/// Codes win: names are only consulted when no code key is present. A
/// Persona Engine `{"data": {...}}` envelope is unwrapped first.
pub fn snapshot_from_json(value: &Value) -> BTreeMap<Trait, f64> {
    let body = match value.get("data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => value,
    };
    let Some(fields) = body.as_object() else {
        return BTreeMap::new();
    };

    let by_code: BTreeMap<Trait, f64> = Trait::ALL
        .into_iter()
        .filter_map(|t| {
            fields
                .get(t.code().to_string().as_str())
                .and_then(Value::as_f64)
                .map(|v| (t, v))
        })
        .collect();
    if !by_code.is_empty() {
        return by_code;
    }

    fields
        .iter()
        .filter_map(|(k, v)| Some((Trait::from_name(k)?, v.as_f64()?)))
        .collect()
}

pub fn snapshot_from_persona(persona: &Persona) -> BTreeMap<Trait, f64> {
    persona.iter().collect()
}

impl Aggregate {
    /// Measured trait means, `None` where no item was answered.
    pub fn means(&self) -> BTreeMap<Trait, Option<f64>> {
        self.trait_summary.iter().map(|(t, s)| (*t, s.mean)).collect()
    }

    pub fn compare_with_persona(&self, snapshot: &BTreeMap<Trait, f64>) -> PersonaComparison {
        let trait_comparisons: BTreeMap<Trait, TraitComparison> = self
            .trait_summary
            .iter()
            .filter_map(|(t, summary)| {
                let persona_value = *snapshot.get(t)?;
                let measured_value = summary.mean?;
                let error = measured_value - persona_value;
                Some((
                    *t,
                    TraitComparison {
                        trait_name: t.name(),
                        persona_value,
                        measured_value,
                        error,
                        abs_error: error.abs(),
                        relative_error: (persona_value != 0.0).then(|| error / persona_value),
                        n_items: summary.n_items,
                        std: summary.std,
                    },
                ))
            })
            .collect();

        let pairs: Vec<(f64, f64)> = trait_comparisons
            .values()
            .map(|c| (c.persona_value, c.measured_value))
            .collect();
        let abs_errors: Vec<f64> = trait_comparisons.values().map(|c| c.abs_error).collect();
        let squared: Vec<f64> = trait_comparisons.values().map(|c| c.error.powi(2)).collect();

        PersonaComparison {
            persona_snapshot: snapshot.clone(),
            overall_metrics: OverallMetrics {
                correlation: stats::pearson(&pairs),
                mean_absolute_error: stats::mean(&abs_errors),
                root_mean_square_error: stats::mean(&squared).map(f64::sqrt),
                traits_compared: trait_comparisons.len(),
            },
            trait_comparisons,
        }
    }
}
