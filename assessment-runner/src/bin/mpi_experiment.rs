//! Run the full condition x seed x item-order matrix and fit the E gradient.

use anyhow::{bail, Context, Result};
use assessment_runner::experiment::{Experiment, ExperimentPlan, SENSITIVITY_FILE, SUMMARY_FILE};
use assessment_runner::inventory::load_inventory;
use assessment_runner::runner::RunOptions;
use clap::Parser;
use dialog_service::eval::DEFAULT_FORMAT_ID;
use dialog_service::services::PersonaClient;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Item order seed; `None` keeps the inventory order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderSeed(Option<u64>);

impl FromStr for OrderSeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("none") {
            return Ok(OrderSeed(None));
        }
        s.trim()
            .parse()
            .map(|seed| OrderSeed(Some(seed)))
            .map_err(|_| format!("expected a number or 'none', got '{}'", s))
    }
}

#[derive(Parser, Debug)]
#[command(name = "mpi-experiment", about = "Run every MPI-AE experiment condition")]
struct Args {
    /// Persona Engine base URL
    #[arg(long, env = "ENGINE_URL", default_value = "http://localhost:5001")]
    engine_url: String,

    /// Dialog orchestrator base URL
    #[arg(long, env = "DIALOG_URL", default_value = "http://localhost:5002")]
    dialog_url: String,

    /// Inventory CSV (label_raw,text,label_ocean,key)
    #[arg(long)]
    items: PathBuf,

    /// Output directory for results, reports and summaries
    #[arg(long, default_value = "runs")]
    runs_dir: PathBuf,

    /// Conditions to run (defaults to every preset)
    #[arg(long, value_delimiter = ',')]
    conditions: Vec<String>,

    /// Model seeds (defaults to 111,222,333)
    #[arg(long, value_delimiter = ',')]
    seeds: Vec<i64>,

    /// Item order seeds, `none` for inventory order (defaults to none,7)
    #[arg(long, value_delimiter = ',')]
    order_seeds: Vec<OrderSeed>,

    /// Single NEUTRAL run with seed 111, for smoke testing a deployment
    #[arg(long, conflicts_with_all = ["conditions", "seeds", "order_seeds"])]
    quick: bool,

    /// Accept near-miss answers such as "B." or "Answer: B"
    #[arg(long)]
    no_strict: bool,

    #[arg(long, default_value = DEFAULT_FORMAT_ID)]
    format_id: String,

    /// Pause between items in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl Args {
    fn plan(&self) -> ExperimentPlan {
        if self.quick {
            return ExperimentPlan::quick();
        }

        let mut plan = ExperimentPlan::default();
        if !self.conditions.is_empty() {
            plan.conditions = self.conditions.clone();
        }
        if !self.seeds.is_empty() {
            plan.seeds = self.seeds.clone();
        }
        if !self.order_seeds.is_empty() {
            plan.order_seeds = self.order_seeds.iter().map(|o| o.0).collect();
        }
        plan
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    assessment_runner::init_cli_tracing();
    let args = Args::parse();

    let items = load_inventory(&args.items)
        .with_context(|| format!("Failed to load inventory {}", args.items.display()))?;
    if items.is_empty() {
        bail!("Inventory {} has no items", args.items.display());
    }

    let plan = args.plan();
    let timeout = Duration::from_secs(args.timeout);
    let experiment = Experiment {
        persona: PersonaClient::new(&args.engine_url, timeout)
            .context("Failed to build persona client")?,
        dialog_url: args.dialog_url.clone(),
        items,
        runs_dir: args.runs_dir.clone(),
        options: RunOptions {
            strict_output: !args.no_strict,
            format_id: args.format_id.clone(),
            delay: Duration::from_millis(args.delay_ms),
            ..RunOptions::default()
        },
        timeout,
    };

    println!(
        "Running {} assessments ({} conditions) against {}",
        plan.run_count(),
        plan.ordered_conditions().len(),
        args.dialog_url
    );
    let outcome = experiment.run(&plan).await?;

    for row in &outcome.rows {
        println!(
            "{:<10} seed={:<4} order={:<5} E={} MAE={} leakage={}",
            row.condition,
            row.seed,
            row.order_seed,
            fmt_opt(row.mean_e),
            fmt_opt(row.mae),
            fmt_opt(row.leakage)
        );
    }
    println!(
        "E gradient sensitivity: slope={} R²={}",
        fmt_opt(outcome.sensitivity.slope),
        fmt_opt(outcome.sensitivity.r_squared)
    );
    println!("Summary: {}", args.runs_dir.join(SUMMARY_FILE).display());
    println!("Sensitivity: {}", args.runs_dir.join(SENSITIVITY_FILE).display());
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.3}", v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_defaults_and_overrides() {
        let args = Args::try_parse_from(["mpi-experiment", "--items", "mpi.csv"]).unwrap();
        assert_eq!(args.plan().run_count(), 54);

        let args = Args::try_parse_from([
            "mpi-experiment",
            "--items",
            "mpi.csv",
            "--conditions",
            "E_HIGH,NEUTRAL",
            "--seeds",
            "1",
            "--order-seeds",
            "none,7",
        ])
        .unwrap();
        let plan = args.plan();
        assert_eq!(plan.ordered_conditions(), vec!["NEUTRAL", "E_HIGH"]);
        assert_eq!(plan.order_seeds, vec![None, Some(7)]);
        assert_eq!(plan.run_count(), 4);
    }

    #[test]
    fn quick_conflicts_with_explicit_matrix() {
        let args = Args::try_parse_from(["mpi-experiment", "--items", "mpi.csv", "--quick"]).unwrap();
        assert_eq!(args.plan().run_count(), 1);

        assert!(Args::try_parse_from(["mpi-experiment", "--items", "x", "--quick", "--seeds", "1"]).is_err());
        assert!(Args::try_parse_from(["mpi-experiment", "--items", "x", "--order-seeds", "later"]).is_err());
    }
}
