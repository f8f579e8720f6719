//! Tidewalk main entry point
//!
//! This is the command-line interface for the Tidewalk crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tidewalk::config::{load_config_with_hash, Config, SinkKind};
use tidewalk::crawler::{Crawler, StatsSnapshot};
use tidewalk::output::{build_sink, load_latest_counts, print_outcome_counts};
use tidewalk::storage::SqliteStorage;
use tracing_subscriber::EnvFilter;

/// Tidewalk: a same-domain web crawler
///
/// Tidewalk crawls one site from a root URL, following links on the same
/// domain up to a depth limit while staying under a requests-per-second
/// ceiling, and reports the text of every page to the configured sink.
#[derive(Parser, Debug)]
#[command(name = "tidewalk")]
#[command(version)]
#[command(about = "A bounded-concurrency same-domain web crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the latest session in the SQLite database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tidewalk=info,warn"),
            1 => EnvFilter::new("tidewalk=debug,info"),
            2 => EnvFilter::new("tidewalk=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Tidewalk Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Max requests per second: {}", config.crawler.max_rps);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Parsing workers: {}", config.crawler.max_parsing_workers);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nSession:");
    println!("  Root URL: {}", config.session.root_url);
    println!("  Max depth: {}", config.session.max_depth);
    println!(
        "  Exclude pattern: {}",
        config.session.exclude_pattern.as_deref().unwrap_or("(none)")
    );

    println!("\nOutput:");
    match config.output.sink {
        SinkKind::Stdout => println!("  Sink: stdout"),
        SinkKind::Sqlite => println!(
            "  Sink: sqlite ({})",
            config.output.database_path.as_deref().unwrap_or("")
        ),
        SinkKind::Elasticsearch => {
            let es = &config.output.elasticsearch;
            println!(
                "  Sink: elasticsearch (http://{}:{}/{}/{})",
                es.host, es.port, es.index, es.doc_type
            );
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows outcome counts for the latest session
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let database_path = config
        .output
        .database_path
        .as_deref()
        .context("--stats requires output.database-path")?;
    println!("Database: {}\n", database_path);

    let storage = SqliteStorage::new(Path::new(database_path))
        .with_context(|| format!("Failed to open database {}", database_path))?;

    match load_latest_counts(&storage)? {
        Some((session, counts)) => print_outcome_counts(&session, &counts),
        None => println!("No crawl sessions recorded yet"),
    }
    Ok(())
}

/// Handles the main crawl operation
///
/// Ctrl-C stops the workers and closes the sink; a SQLite session is then
/// recorded as interrupted.
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    let sink = build_sink(&config.output, &config.session.root_url, config_hash)
        .context("Failed to set up result sink")?;
    let crawler = Crawler::new(config.crawler.clone(), config.session.clone(), sink)?;

    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::warn!("Interrupted, stopping crawl"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };
    let stats = crawler.run_until(interrupt).await?;

    log_stats(&stats);
    Ok(())
}

fn log_stats(stats: &StatsSnapshot) {
    tracing::info!(
        "Processed {} urls: {} pages parsed, {} outcomes reported ({} sink failures)",
        stats.items_processed,
        stats.pages_parsed,
        stats.outcomes_reported,
        stats.sink_failures
    );
    tracing::info!(
        "{} fetch attempts, {} urls abandoned, {} redirects followed, {} links enqueued, {} dropped at depth limit, {} unexpected errors",
        stats.fetch_attempts,
        stats.urls_abandoned,
        stats.redirects_followed,
        stats.links_enqueued,
        stats.depth_limit_drops,
        stats.unexpected_errors
    );
}
