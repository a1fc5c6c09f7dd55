//! MPI-AE assessment tooling for the dialog orchestrator.
//!
//! Three steps make up a single assessment:
//!
//! 1. seed a persona in the Persona Engine ([`seed`]),
//! 2. put every inventory item to the dialog endpoint in assessment mode ([`runner`]),
//! 3. score the answers per trait and compare them with the seeded persona
//!    ([`aggregator`], [`report`]).
//!
//! [`experiment`] repeats them over every preset condition, model seed and
//! item order; [`summary`] and [`checks`] consolidate and validate the runs.
//!
//! ```bash
//! persona-seed --user-id E_HIGH --preset E_HIGH
//! mpi-run --user-id E_HIGH --items inventories/mpi_sample.csv --seed 111 --output runs/e_high.json
//! mpi-report --results runs/e_high.json --persona '{"extraversion": 4.5}'
//!
//! mpi-experiment --items inventories/mpi_sample.csv --runs-dir runs
//! mpi-summarize --runs-dir runs
//! mpi-check --runs-dir runs
//! ```

pub mod aggregator;
pub mod checks;
pub mod error;
pub mod experiment;
pub mod inventory;
pub mod report;
pub mod runner;
pub mod seed;
pub mod stats;
pub mod summary;

pub use error::AssessmentError;

/// Plain-text logs for the command line tools. `RUST_LOG` overrides the default filter.
pub fn init_cli_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,assessment_runner=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
}
