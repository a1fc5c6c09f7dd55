//! Markdown report for an aggregated run.

use dialog_service::eval::Choice;
use dialog_service::services::Trait;
use std::fmt::Write;

use crate::aggregator::{Aggregate, PersonaComparison};

/// Unknown answers listed individually before the report summarizes the rest.
const MAX_LISTED_UNKNOWN: usize = 10;

fn fixed(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", precision, v),
        _ => "N/A".to_string(),
    }
}

pub fn render_report(aggregate: &Aggregate, comparison: Option<&PersonaComparison>) -> String {
    let mut out = String::new();
    let meta = &aggregate.metadata;

    // Writing to a String cannot fail.
    let _ = writeln!(out, "# MPI Assessment Analysis Report");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out);
    let _ = writeln!(out, "**User ID:** {}", meta.user_id);
    let _ = writeln!(out, "**Total Items:** {}", meta.total_items);
    let _ = writeln!(out, "**Valid Items:** {}", meta.valid_items);
    let _ = writeln!(out, "**Unknown Responses:** {}", meta.unk_items);
    let _ = writeln!(out, "**Completion Rate:** {:.1}%", meta.completion_rate * 100.0);
    let _ = writeln!(out);

    let _ = writeln!(out, "## Response Distribution");
    let _ = writeln!(out, "| Choice | Count | Percentage |");
    let _ = writeln!(out, "|--------|-------|------------|");
    for choice in Choice::ANSWERS.into_iter().chain(std::iter::once(Choice::Unknown)) {
        let count = aggregate.choice_counts.get(&choice).copied().unwrap_or(0);
        let pct = if meta.total_items > 0 {
            count as f64 / meta.total_items as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "| {} | {} | {:.1}% |", choice, count, pct);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Trait Summary");
    let _ = writeln!(out, "| Trait | Name | Mean | Std | N Items |");
    let _ = writeln!(out, "|-------|------|------|-----|---------|");
    for t in Trait::ALL {
        if let Some(summary) = aggregate.trait_summary.get(&t) {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                summary.code,
                summary.trait_name,
                fixed(summary.mean, 2),
                fixed(summary.std, 2),
                summary.n_items
            );
        }
    }
    let _ = writeln!(out);

    if let Some(comparison) = comparison {
        let _ = writeln!(out, "## Persona Comparison");
        let _ = writeln!(out, "| Trait | Persona | Measured | Error | Abs Error |");
        let _ = writeln!(out, "|-------|---------|----------|-------|-----------|");
        for t in Trait::ALL {
            if let Some(c) = comparison.trait_comparisons.get(&t) {
                let _ = writeln!(
                    out,
                    "| {} | {:.1} | {:.2} | {:+.2} | {:.2} |",
                    t.code(),
                    c.persona_value,
                    c.measured_value,
                    c.error,
                    c.abs_error
                );
            }
        }
        let metrics = &comparison.overall_metrics;
        let _ = writeln!(out);
        let _ = writeln!(out, "**Overall Correlation:** {}", fixed(metrics.correlation, 3));
        let _ = writeln!(out, "**Mean Absolute Error:** {}", fixed(metrics.mean_absolute_error, 3));
        let _ = writeln!(out, "**RMSE:** {}", fixed(metrics.root_mean_square_error, 3));
        let _ = writeln!(out);
    }

    let quality = &aggregate.quality_metrics;
    let _ = writeln!(out, "## Quality Metrics");
    let _ = writeln!(
        out,
        "**Extreme Response Bias (A+E):** {:.1}%",
        quality.extreme_response_bias * 100.0
    );
    let _ = writeln!(
        out,
        "**Avg Within-Trait Consistency:** {}",
        fixed(quality.avg_within_trait_consistency, 2)
    );
    let _ = writeln!(out);

    if !aggregate.unk_items.is_empty() {
        let _ = writeln!(out, "## Items with Unknown Responses");
        for item in aggregate.unk_items.iter().take(MAX_LISTED_UNKNOWN) {
            let _ = writeln!(
                out,
                "- **{}**: \"{}\" → \"{}\"",
                item.label_raw, item.item_text, item.raw_output
            );
        }
        if aggregate.unk_items.len() > MAX_LISTED_UNKNOWN {
            let _ = writeln!(
                out,
                "... and {} more",
                aggregate.unk_items.len() - MAX_LISTED_UNKNOWN
            );
        }
        let _ = writeln!(out);
    }

    out
}
