use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eshop_etl::load::db::Db;
use eshop_etl::load::files;
use eshop_etl::load::pools::fetch_identity_pools;
use eshop_etl::load::save::save_all;
use eshop_etl::pipeline::{self, PipelineInput};
use eshop_etl::synth::SynthConfig;
use eshop_etl::util::env as env_util;

#[derive(Parser)]
#[command(
    name = "etl",
    about = "Reconcile raw storefront exports and merge them into the shared store"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full batch: read exports, build every entity set, merge.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory holding products/, feedback/ and feedback_manager/.
    #[arg(long, default_value = "rawData")]
    data_dir: PathBuf,
    /// Seed for the pipeline RNG; identical seed + input reproduces
    /// every synthetic row.
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Reference "now" as YYYY-MM-DD HH:MM:SS; defaults to the wall
    /// clock (pass it explicitly for reproducible runs).
    #[arg(long)]
    reference_time: Option<String>,
    /// Organic orders to synthesize on top of feedback-backed ones.
    #[arg(long, default_value_t = 5000)]
    orders: usize,
    /// Variants to attach a discount to.
    #[arg(long, default_value_t = 1000)]
    discounts: usize,
    /// Build and report every entity set but skip the store writes.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let reference_time = match &args.reference_time {
        Some(raw) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .context("--reference-time must be YYYY-MM-DD HH:MM:SS")?,
        None => chrono::Utc::now().naive_utc(),
    };
    let mut cfg = SynthConfig::new(args.seed, reference_time);
    cfg.organic_orders = args.orders;
    cfg.discount_count = args.discounts;

    let products = files::read_products(&args.data_dir)?;
    let feedback = files::read_feedback(&args.data_dir)?;
    let feedback_responses = files::read_feedback_responses(&args.data_dir)?;

    let database_url = env_util::db_url().context("no database URL configured for etl")?;
    let max_conns: u32 = env_util::env_parse("DB_MAX_CONNS", 8);
    let db = Db::connect(&database_url, max_conns).await?;
    let pools = fetch_identity_pools(&db).await?;

    let input = PipelineInput {
        products,
        feedback,
        feedback_responses,
        pools,
    };
    let sets = pipeline::run(&input, &cfg);

    let counts: serde_json::Map<String, serde_json::Value> = sets
        .counts()
        .into_iter()
        .map(|(name, count)| (name.to_string(), serde_json::Value::from(count)))
        .collect();
    let summary = serde_json::json!({
        "seed": cfg.seed,
        "reference_time": reference_time.format("%Y-%m-%d %H:%M:%S").to_string(),
        "entity_counts": counts,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.dry_run {
        info!("dry run; skipping store writes");
        return Ok(());
    }

    save_all(&db, &sets).await?;
    info!("batch merged");
    Ok(())
}
