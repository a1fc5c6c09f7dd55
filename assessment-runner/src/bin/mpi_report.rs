//! Aggregate a results file into a Markdown report.

use anyhow::{Context, Result};
use assessment_runner::aggregator::{aggregate, snapshot_from_json, snapshot_from_persona};
use assessment_runner::report::render_report;
use assessment_runner::runner::RunResults;
use clap::Parser;
use dialog_service::services::{PersonaClient, Trait};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mpi-report", about = "Aggregate MPI assessment results")]
struct Args {
    /// Results JSON written by mpi-run
    #[arg(long)]
    results: PathBuf,

    /// Persona snapshot as a JSON string or a path to a JSON file
    #[arg(long)]
    persona: Option<String>,

    /// Persona Engine base URL used with --fetch-persona
    #[arg(long, env = "ENGINE_URL")]
    engine_url: Option<String>,

    /// Read the snapshot for the results' user from the Persona Engine
    #[arg(long)]
    fetch_persona: bool,

    /// Markdown report path
    #[arg(long, default_value = "analysis_report.md")]
    output: PathBuf,

    /// Also write the full aggregation as JSON
    #[arg(long)]
    json_output: Option<PathBuf>,
}

fn read_snapshot(raw: &str) -> Result<BTreeMap<Trait, f64>> {
    let text = if raw.trim_start().starts_with('{') {
        raw.to_string()
    } else {
        std::fs::read_to_string(raw).with_context(|| format!("Failed to read persona file {}", raw))?
    };
    let value: serde_json::Value = serde_json::from_str(&text).context("Persona is not valid JSON")?;
    Ok(snapshot_from_json(&value))
}

#[tokio::main]
async fn main() -> Result<()> {
    assessment_runner::init_cli_tracing();
    let args = Args::parse();

    let data = RunResults::load(&args.results)
        .with_context(|| format!("Failed to load results {}", args.results.display()))?;
    let aggregated = aggregate(&data);

    let snapshot = match (&args.persona, args.fetch_persona) {
        (Some(raw), _) => match read_snapshot(raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Could not parse persona data, skipping comparison");
                None
            }
        },
        (None, true) => {
            let url = args.engine_url.as_deref().unwrap_or("http://localhost:5001");
            let client = PersonaClient::new(url, Duration::from_secs(10))?;
            let persona = client.get_persona(&data.user_id, None).await?;
            Some(snapshot_from_persona(&persona))
        }
        (None, false) => None,
    };

    let comparison = snapshot
        .filter(|s| !s.is_empty())
        .map(|s| aggregated.compare_with_persona(&s));

    let report = render_report(&aggregated, comparison.as_ref());
    std::fs::write(&args.output, &report)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if let Some(path) = &args.json_output {
        let body = serde_json::json!({
            "aggregate": aggregated,
            "persona_comparison": comparison,
        });
        std::fs::write(path, serde_json::to_string_pretty(&body)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    println!("Analysis complete! Report saved to: {}", args.output.display());
    println!(
        "Valid responses: {}/{}",
        aggregated.metadata.valid_items, aggregated.metadata.total_items
    );
    if let Some(c) = &comparison {
        match c.overall_metrics.correlation {
            Some(r) => println!("Correlation with persona: {:.3}", r),
            None => println!("Correlation with persona: N/A"),
        }
    }
    Ok(())
}
