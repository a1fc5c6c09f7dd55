//! Seed a persona in the Persona Engine from a preset and/or explicit scores.

use anyhow::{Context, Result};
use assessment_runner::seed::{build_profile, parse_assignments, seed_persona, PRESETS};
use clap::Parser;
use dialog_service::services::PersonaClient;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "persona-seed", about = "Create a persona and set its five traits")]
struct Args {
    /// Persona Engine base URL
    #[arg(long, env = "ENGINE_URL", default_value = "http://localhost:5001")]
    engine_url: String,

    /// User to seed
    #[arg(long, required_unless_present = "list_presets")]
    user_id: Option<String>,

    /// Named condition (NEUTRAL, E_HIGH, C_HIGH, N_LOW, E_20..E_50, TEST_USER)
    #[arg(long)]
    preset: Option<String>,

    /// Overrides such as `openness=4.5,N=2`
    #[arg(long)]
    traits: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// List the presets and exit
    #[arg(long)]
    list_presets: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    assessment_runner::init_cli_tracing();
    let args = Args::parse();

    if args.list_presets {
        for (name, scores) in PRESETS {
            println!("{:<10} O={} C={} E={} A={} N={}", name, scores[0], scores[1], scores[2], scores[3], scores[4]);
        }
        return Ok(());
    }

    let user_id = args.user_id.context("--user-id is required")?;
    let overrides = match args.traits.as_deref() {
        Some(raw) => parse_assignments(raw)?,
        None => Vec::new(),
    };
    let profile = build_profile(args.preset.as_deref(), &overrides)?;

    let client = PersonaClient::new(&args.engine_url, Duration::from_secs(args.timeout))
        .context("Failed to build persona client")?;
    let stored = seed_persona(&client, &user_id, &profile)
        .await
        .with_context(|| format!("Failed to seed persona '{}'", user_id))?;

    println!("{}", serde_json::to_string_pretty(&stored)?);
    Ok(())
}
