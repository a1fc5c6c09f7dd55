//! Scan a runs directory and write one consolidated summary row per results file.

use anyhow::{bail, Context, Result};
use assessment_runner::summary::{scan_runs, write_summary, GLOBAL_SUMMARY_FILE};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mpi-summarize", about = "Consolidate MPI-AE runs into one CSV")]
struct Args {
    /// Directory written by mpi-experiment
    #[arg(long, default_value = "runs")]
    runs_dir: PathBuf,

    /// Summary CSV path (defaults to <runs-dir>/global_summary.csv)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    assessment_runner::init_cli_tracing();
    let args = Args::parse();

    if !args.runs_dir.is_dir() {
        bail!("{} is not a directory", args.runs_dir.display());
    }
    let rows = scan_runs(&args.runs_dir)
        .with_context(|| format!("Failed to scan {}", args.runs_dir.display()))?;
    if rows.is_empty() {
        bail!("No result files found under {}", args.runs_dir.display());
    }

    let output = args
        .output
        .unwrap_or_else(|| args.runs_dir.join(GLOBAL_SUMMARY_FILE));
    write_summary(&output, &rows)?;

    let conditions: BTreeSet<&str> = rows.iter().map(|r| r.condition.as_str()).collect();
    let total_tokens: u64 = rows.iter().map(|r| r.total_tokens).sum();
    let avg_unk_rate = rows.iter().map(|r| r.unk_rate).sum::<f64>() / rows.len() as f64;

    println!("Processed {} experimental runs", rows.len());
    println!("Conditions found: {}", conditions.into_iter().collect::<Vec<_>>().join(", "));
    println!("Summary generated: {}", output.display());
    println!("Total tokens consumed: {}", total_tokens);
    println!("Average UNK rate: {:.3}", avg_unk_rate);
    Ok(())
}
