//! QA-Harvest main entry point
//!
//! This is the command-line interface for the QA-Harvest content crawler.

use anyhow::Context;
use clap::Parser;
use qa_harvest::config::{load_config_with_hash, Config};
use qa_harvest::crawler::Coordinator;
use qa_harvest::output::{load_statistics, print_direct_report, print_run_report, print_statistics};
use qa_harvest::persist::ContentWriter;
use qa_harvest::services::HttpEmbedder;
use qa_harvest::storage::open_storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// QA-Harvest: a polite travel Q&A content harvester
///
/// QA-Harvest mines help-center and community-forum listing pages for
/// question threads, extracts them through per-platform strategy cascades,
/// and stores deduplicated records with paragraph chunks for embedding.
///
/// With no phase flag a full run executes: recover interrupted targets,
/// discover, process one batch, clean up.
#[derive(Parser, Debug)]
#[command(name = "qa-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite travel Q&A content harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the discovery phase
    #[arg(long)]
    discover: bool,

    /// Process one batch of queued targets
    #[arg(long)]
    process: bool,

    /// Delete completed and expired failed targets
    #[arg(long)]
    cleanup: bool,

    /// Scrape the [direct] URL list, bypassing the queue
    #[arg(long, conflicts_with_all = ["discover", "process", "cleanup"])]
    direct: bool,

    /// Validate config and print the platform table without crawling
    #[arg(long, conflicts_with_all = ["stats", "direct"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "direct"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.direct {
        handle_direct(config).await?;
    } else {
        handle_run(config, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("qa_harvest=info,warn"),
            1 => EnvFilter::new("qa_harvest=debug,info"),
            2 => EnvFilter::new("qa_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the resolved platform table
fn handle_dry_run(config: &Config) {
    println!("=== QA-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Retention: {} days", config.crawler.retention_days);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Rate-limit cool-down: {}ms", config.crawler.rate_limit_cooldown_ms);
    println!("  Jitter: ±{:.0}%", config.crawler.jitter_ratio * 100.0);
    println!("  HEAD pre-flight: {}", config.crawler.preflight);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    match &config.embedding {
        Some(embedding) => println!("  Embeddings: {}", embedding.endpoint),
        None => println!("  Embeddings: disabled"),
    }

    println!("\nPlatforms ({}):", config.platforms.len());
    for platform in &config.platforms {
        println!(
            "  - {} [{}] priority {}, {} req/min, {}ms interval{}",
            platform.name,
            platform.content_type.as_str(),
            platform.priority,
            platform.politeness.burst,
            platform.politeness.interval_ms,
            if platform.api.is_some() { ", JSON API" } else { "" }
        );
        println!("    domains: {}", platform.domains.join(", "));
        for listing in &platform.listing_urls {
            println!("    * {}", listing);
        }
    }

    println!("\nDirect URLs ({}):", config.direct.urls.len());
    for url in &config.direct.urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

fn build_coordinator(
    config: Config,
) -> anyhow::Result<Coordinator<qa_harvest::storage::SqliteStorage>> {
    let storage = open_storage(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    let mut writer = ContentWriter::new(&config.quality);
    if let Some(embedding) = &config.embedding {
        let embedder = HttpEmbedder::new(embedding).context("Failed to build embedding client")?;
        writer = writer.with_embedder(Arc::new(embedder));
    }

    Ok(Coordinator::new(config, storage)?.with_writer(writer))
}

/// Handles queue phases; no phase flag means a full run
async fn handle_run(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let mut coordinator = build_coordinator(config)?;

    if !(cli.discover || cli.process || cli.cleanup) {
        let report = coordinator.run().await?;
        print_run_report(&report);
        return Ok(());
    }

    coordinator.recover_interrupted()?;
    if cli.discover {
        coordinator.discover().await?;
    }
    if cli.process {
        coordinator.process_batch().await?;
    }
    if cli.cleanup {
        coordinator.cleanup(chrono::Utc::now())?;
    }

    Ok(())
}

/// Handles the --direct mode: scrapes the configured URL list
async fn handle_direct(config: Config) -> anyhow::Result<()> {
    let urls = config.direct.urls.clone();
    if urls.is_empty() {
        anyhow::bail!("--direct given but the [direct] URL list is empty");
    }

    let mut coordinator = build_coordinator(config)?;
    let report = coordinator.run_direct(&urls).await?;
    print_direct_report(&report);

    Ok(())
}
