//! Consolidated summary over every results file under a runs directory.

use dialog_service::services::Trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregator::{aggregate, snapshot_from_persona};
use crate::error::AssessmentError;
use crate::experiment::{order_label, RunKey};
use crate::runner::RunResults;
use crate::seed::preset;
use crate::stats;

pub const GLOBAL_SUMMARY_FILE: &str = "global_summary.csv";

/// One results file, scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub condition: String,
    pub seed: String,
    pub order: String,
    pub valid_responses: usize,
    pub total_responses: usize,
    pub unk_rate: f64,
    #[serde(rename = "O_mean")]
    pub o_mean: Option<f64>,
    #[serde(rename = "C_mean")]
    pub c_mean: Option<f64>,
    #[serde(rename = "E_mean")]
    pub e_mean: Option<f64>,
    #[serde(rename = "A_mean")]
    pub a_mean: Option<f64>,
    #[serde(rename = "N_mean")]
    pub n_mean: Option<f64>,
    /// Against the preset of the same name, when there is one.
    pub correlation: Option<f64>,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub total_tokens: u64,
}

impl RunSummary {
    pub fn mean(&self, t: Trait) -> Option<f64> {
        match t {
            Trait::Openness => self.o_mean,
            Trait::Conscientiousness => self.c_mean,
            Trait::Extraversion => self.e_mean,
            Trait::Agreeableness => self.a_mean,
            Trait::Neuroticism => self.n_mean,
        }
    }
}

pub fn summarize_run(condition: &str, file_stem: &str, data: &RunResults) -> RunSummary {
    let key = RunKey::from_tag(file_stem);
    let agg = aggregate(data);
    let means = agg.means();
    let mean = |t: Trait| means.get(&t).copied().flatten();

    let valid = agg.metadata.valid_items;
    let total = valid + agg.metadata.unk_items;

    let overall = preset(condition)
        .map(|persona| agg.compare_with_persona(&snapshot_from_persona(&persona)).overall_metrics);

    let latencies: Vec<f64> = data.results.iter().map(|r| r.latency_ms as f64).collect();

    RunSummary {
        condition: condition.to_string(),
        seed: key
            .as_ref()
            .map_or_else(|| "unknown".to_string(), |k| k.seed.to_string()),
        order: order_label(key.and_then(|k| k.order_seed)),
        valid_responses: valid,
        total_responses: total,
        unk_rate: if total > 0 {
            agg.metadata.unk_items as f64 / total as f64
        } else {
            0.0
        },
        o_mean: mean(Trait::Openness),
        c_mean: mean(Trait::Conscientiousness),
        e_mean: mean(Trait::Extraversion),
        a_mean: mean(Trait::Agreeableness),
        n_mean: mean(Trait::Neuroticism),
        correlation: overall.as_ref().and_then(|m| m.correlation),
        mae: overall.as_ref().and_then(|m| m.mean_absolute_error),
        rmse: overall.as_ref().and_then(|m| m.root_mean_square_error),
        avg_latency_ms: stats::mean(&latencies),
        p95_latency_ms: stats::p95(&latencies),
        total_tokens: data
            .results
            .iter()
            .map(|r| u64::from(r.prompt_tokens) + u64::from(r.completion_tokens))
            .sum(),
    }
}

/// Score every `<condition>/*.json` under `runs_dir`, sorted by condition,
/// seed and order. Hidden directories are ignored and unreadable files are
/// logged and skipped.
pub fn scan_runs(runs_dir: &Path) -> Result<Vec<RunSummary>, AssessmentError> {
    let mut summaries = Vec::new();

    let entries = std::fs::read_dir(runs_dir).map_err(|e| AssessmentError::io(runs_dir, e))?;
    for entry in entries {
        let dir = entry.map_err(|e| AssessmentError::io(runs_dir, e))?.path();
        let Some(condition) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if !dir.is_dir() || condition.starts_with('.') {
            continue;
        }

        let files = std::fs::read_dir(&dir).map_err(|e| AssessmentError::io(&dir, e))?;
        for file in files {
            let path = file.map_err(|e| AssessmentError::io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();

            match RunResults::load(&path) {
                Ok(data) => summaries.push(summarize_run(&condition, stem, &data)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping results file"),
            }
        }
    }

    summaries.sort_by(|a, b| {
        (&a.condition, &a.seed, &a.order).cmp(&(&b.condition, &b.seed, &b.order))
    });
    Ok(summaries)
}

pub fn write_summary(path: &Path, rows: &[RunSummary]) -> Result<(), AssessmentError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| AssessmentError::io(path, e))?;
    Ok(())
}

pub fn load_summary(path: &Path) -> Result<Vec<RunSummary>, AssessmentError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<RunSummary>, _>>()?;
    Ok(rows)
}
