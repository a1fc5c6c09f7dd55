//! Run an MPI inventory against the dialog orchestrator and save the answers.

use anyhow::{bail, Context, Result};
use assessment_runner::inventory::load_inventory;
use assessment_runner::runner::{MpiRunner, RunOptions, RunResults};
use clap::Parser;
use dialog_service::eval::DEFAULT_FORMAT_ID;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mpi-run", about = "Run an MPI assessment via the dialog HTTP API")]
struct Args {
    /// Dialog orchestrator base URL
    #[arg(long, env = "DIALOG_URL", default_value = "http://localhost:5002")]
    url: String,

    /// User whose persona answers the inventory
    #[arg(long)]
    user_id: String,

    /// Inventory CSV (label_raw,text,label_ocean,key)
    #[arg(long)]
    items: PathBuf,

    /// Results JSON path
    #[arg(long, default_value = "mpi_results.json")]
    output: PathBuf,

    /// Seed forwarded to the model
    #[arg(long)]
    seed: Option<i64>,

    /// Shuffle item order with this seed
    #[arg(long)]
    item_order_seed: Option<u64>,

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

#[tokio::main]
async fn main() -> Result<()> {
    assessment_runner::init_cli_tracing();
    let args = Args::parse();

    let items = load_inventory(&args.items)
        .with_context(|| format!("Failed to load inventory {}", args.items.display()))?;
    if items.is_empty() {
        bail!("Inventory {} has no items", args.items.display());
    }

    let runner = MpiRunner::new(&args.url, &args.user_id, Duration::from_secs(args.timeout))?;
    let options = RunOptions {
        seed: args.seed,
        strict_output: !args.no_strict,
        format_id: args.format_id,
        order_seed: args.item_order_seed,
        delay: Duration::from_millis(args.delay_ms),
    };

    let results = runner.run(&items, &options).await;
    let answered = results.len();
    RunResults::new(runner.user_id(), results).save(&args.output)?;

    println!(
        "Completed assessment: {}/{} items processed successfully -> {}",
        answered,
        items.len(),
        args.output.display()
    );
    Ok(())
}
