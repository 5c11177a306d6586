//! fx-ingest CLI - daily exchange-rate ingestion
//!
//! Fetches historical FX snapshots, writes NDJSON blobs into object storage,
//! and triggers a BigQuery load over the written window.
//!
//! ## Example Usage
//!
//! ```bash
//! # Ingest the last 3 days for SGD and USD, then load the table
//! fx-ingest run --delta 3 --bases SGD,USD --app-id $OXR_APP_ID \
//!     --project my-project --bucket my-bucket \
//!     --dataset analytics --table exchange_rates --token $GOOGLE_OAUTH_TOKEN
//!
//! # Fetch a single (date, base) unit and print the NDJSON
//! fx-ingest fetch --date 2024-03-10 --base USD --app-id $OXR_APP_ID
//! ```

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use fx_ingest::config::{parse_bases, IngestConfig};
use fx_ingest::provider::OpenExchangeRatesClient;
use fx_ingest::scheduler::{fetch_and_serialize, window, Pipeline};
use fx_ingest::storage::GcsBlobStore;
use fx_ingest::warehouse::BigQueryLoader;
use std::fs;
use std::path::PathBuf;
use std::process;

/// fx-ingest: daily FX rate snapshots into object storage and BigQuery
#[derive(Parser)]
#[command(name = "fx-ingest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Daily FX rate snapshot ingestion", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (default: ~/.fx-ingest/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a window of dates and trigger the warehouse load
    Run {
        /// Window end date (YYYY-MM-DD, default: yesterday)
        #[arg(long)]
        from: Option<String>,

        /// Number of days to walk backward
        #[arg(long)]
        delta: Option<u32>,

        /// Comma-separated base currencies
        #[arg(long)]
        bases: Option<String>,

        /// Open Exchange Rates app id
        #[arg(long)]
        app_id: Option<String>,

        /// GCP project owning the dataset
        #[arg(long)]
        project: Option<String>,

        /// Storage bucket receiving the blobs
        #[arg(long)]
        bucket: Option<String>,

        /// BigQuery dataset
        #[arg(long)]
        dataset: Option<String>,

        /// BigQuery table
        #[arg(long)]
        table: Option<String>,

        /// OAuth bearer token for storage and warehouse calls
        #[arg(long)]
        token: Option<String>,
    },

    /// Fetch one (date, base) snapshot and print or save the NDJSON
    Fetch {
        /// Snapshot date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Base currency
        #[arg(long, default_value = "SGD")]
        base: String,

        /// Open Exchange Rates app id
        #[arg(long)]
        app_id: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            from,
            delta,
            bases,
            app_id,
            project,
            bucket,
            dataset,
            table,
            token,
        } => {
            run_pipeline(RunArgs {
                from,
                delta,
                bases,
                app_id,
                project,
                bucket,
                dataset,
                table,
                token,
                verbose: cli.verbose,
                config_path: cli.config,
            })
            .await
        }

        Commands::Fetch {
            date,
            base,
            app_id,
            output,
        } => fetch_unit(date, base, app_id, output, cli.config).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

struct RunArgs {
    from: Option<String>,
    delta: Option<u32>,
    bases: Option<String>,
    app_id: Option<String>,
    project: Option<String>,
    bucket: Option<String>,
    dataset: Option<String>,
    table: Option<String>,
    token: Option<String>,
    verbose: bool,
    config_path: Option<PathBuf>,
}

async fn run_pipeline(args: RunArgs) -> anyhow::Result<()> {
    let mut config = IngestConfig::load(args.config_path.as_deref())?;

    if let Some(from) = args.from {
        config.from = parse_date(&from).context("invalid --from date")?;
    }
    if let Some(delta) = args.delta {
        config.delta = delta;
    }
    if let Some(bases) = args.bases {
        config.bases = parse_bases(&bases);
    }
    if let Some(app_id) = args.app_id {
        config.app_id = app_id;
    }
    if let Some(project) = args.project {
        config.project = project;
    }
    if let Some(bucket) = args.bucket {
        config.bucket = bucket;
    }
    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(table) = args.table {
        config.table = table;
    }
    if let Some(token) = args.token {
        config.token = token;
    }

    config.validate()?;

    if args.verbose {
        println!("{}", "Ingesting exchange rates...".cyan().bold());
        println!("  {} {}", "Window end:".bold(), config.from);
        println!("  {} {} days", "Delta:".bold(), config.delta);
        println!("  {} {}", "Bases:".bold(), config.bases.join(", "));
        println!(
            "  {} gs://{} -> {}.{}",
            "Destination:".bold(),
            config.bucket,
            config.dataset,
            config.table
        );
        println!();
    }

    let units = window(config.from, config.delta).len() * config.bases.len();
    let bucket = config.bucket.clone();

    let provider = OpenExchangeRatesClient::new(config.app_id.clone())
        .context("failed to create rate provider client")?;
    let store = GcsBlobStore::new(config.bucket.clone(), config.token.clone())
        .context("failed to create storage client")?;
    let loader = BigQueryLoader::new(config.project.clone(), config.token.clone())
        .context("failed to create warehouse client")?;

    Pipeline::new(provider, store, loader, config)
        .run()
        .await
        .context("ingestion failed")?;

    println!(
        "{} Wrote {} blobs and loaded gs://{}/rates/*",
        "✓".green().bold(),
        units,
        bucket
    );
    Ok(())
}

async fn fetch_unit(
    date: String,
    base: String,
    app_id: Option<String>,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = IngestConfig::load(config_path.as_deref())?;
    let app_id = app_id
        .or_else(|| (!config.app_id.is_empty()).then(|| config.app_id.clone()))
        .context("missing Open Exchange Rates app id (--app-id or config file)")?;
    let date = parse_date(&date).context("invalid --date")?;

    let provider =
        OpenExchangeRatesClient::new(app_id).context("failed to create rate provider client")?;
    let payload = fetch_and_serialize(&provider, date, &base).await?;

    match output {
        Some(path) => {
            fs::write(&path, &payload)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} bytes written to {}",
                "✓".green().bold(),
                payload.len(),
                path.display()
            );
        }
        None => {
            println!("{}", String::from_utf8_lossy(&payload));
        }
    }
    Ok(())
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD, got {:?}", raw))
}
