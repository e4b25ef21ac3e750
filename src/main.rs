use anyhow::Context;
use cbrx::config::{load_records, AppConfig};
use cbrx::MemoryCaseBase;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Case-based reasoning over a JSON case base
#[derive(Parser, Debug)]
#[command(name = "cbrx")]
#[command(about = "Retrieve the most similar cases and propose a solution", long_about = None)]
struct Args {
    /// Path to the application config (recovery model and aggregator)
    #[arg(short, long)]
    config: PathBuf,

    /// JSON array of case records; ids are assigned by position
    #[arg(long, required_unless_present = "describe")]
    cases: Option<PathBuf>,

    /// JSON record, or array of records, to find neighbours for
    #[arg(short, long, required_unless_present = "describe")]
    query: Option<PathBuf>,

    /// Number of neighbours per query
    #[arg(short, default_value_t = 5)]
    k: usize,

    /// Aggregate the neighbours into a solution
    #[arg(long)]
    recommend: bool,

    /// Print the configuration snapshot and exit
    #[arg(long)]
    describe: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting cbrx v{}", env!("CARGO_PKG_VERSION"));
    let config = AppConfig::from_file(&args.config)?;

    let Some(cases) = &args.cases else {
        // --describe without a case base: configuration only
        let recovery = config.recovery()?;
        let snapshot = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "recovery": recovery.describe(),
            "aggregator": config.aggregator,
            "refit_always": config.refit_always,
        });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    };

    let records = load_records(cases)?;
    info!("Loaded {} cases from {:?}", records.len(), cases);
    let cbr = config.build(MemoryCaseBase::from_records(records))?;

    if args.describe {
        println!("{}", serde_json::to_string_pretty(&cbr.describe())?);
        return Ok(());
    }

    let query_path = args.query.as_ref().context("--query is required")?;
    let queries = load_records(query_path)?;
    info!("Answering {} queries with k = {}", queries.len(), args.k);

    let output = if args.recommend {
        let recommendations = queries
            .iter()
            .map(|q| cbr.recommend(q, args.k))
            .collect::<cbrx::Result<Vec<_>>>()?;
        serde_json::to_string_pretty(&recommendations)?
    } else {
        serde_json::to_string_pretty(&cbr.retrieve_batch(&queries, args.k)?)?
    };
    println!("{}", output);
    Ok(())
}
