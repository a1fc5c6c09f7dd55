//! Validate a finished experiment against quality thresholds.

use anyhow::{bail, Context, Result};
use assessment_runner::checks::{run_checks, Thresholds};
use assessment_runner::experiment::{Sensitivity, SENSITIVITY_FILE};
use assessment_runner::summary::{load_summary, GLOBAL_SUMMARY_FILE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mpi-check", about = "Check monotonicity, UNK rates and E sensitivity")]
struct Args {
    /// Directory written by mpi-experiment and mpi-summarize
    #[arg(long, default_value = "runs")]
    runs_dir: PathBuf,

    /// Summary CSV (defaults to <runs-dir>/global_summary.csv)
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    assessment_runner::init_cli_tracing();
    let args = Args::parse();

    let summary = args
        .summary
        .unwrap_or_else(|| args.runs_dir.join(GLOBAL_SUMMARY_FILE));
    let rows = load_summary(&summary)
        .with_context(|| format!("Failed to read {}", summary.display()))?;
    if rows.is_empty() {
        bail!("No data found in {}", summary.display());
    }
    println!("Found {} experimental runs", rows.len());

    let sensitivity_path = args.runs_dir.join(SENSITIVITY_FILE);
    let sensitivity = if sensitivity_path.exists() {
        Some(Sensitivity::load(&sensitivity_path)?)
    } else {
        None
    };

    let outcomes = run_checks(&rows, sensitivity.as_ref(), &Thresholds::default());
    for outcome in &outcomes {
        println!("{}:\n  {}\n", outcome.name, outcome.message);
    }

    let failed: Vec<&str> = outcomes.iter().filter(|o| !o.passed).map(|o| o.name).collect();
    if !failed.is_empty() {
        bail!("{} check(s) failed: {}", failed.len(), failed.join(", "));
    }
    println!("All validation checks passed");
    Ok(())
}
