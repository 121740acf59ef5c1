//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest content harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, Config};
use sumi_harvest::harvest::{generate_urls, Harvester};
use sumi_harvest::output::print_report;
use sumi_harvest::FieldSelector;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a bounded, rate-limited content harvester
///
/// Sumi-Harvest fetches a fixed set of URLs with a pool of rate-limited
/// workers, extracts configured fields from each page, and reports every URL
/// that could not be fetched.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A bounded, rate-limited content harvester", long_about = None)]
struct Cli {
    /// Path to JSON or TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from {}",
            cli.config.display()
        )
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the work items and extraction rules
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Pipeline Configuration:");
    println!("  Work items: {}", config.link_count);
    println!("  Fetch workers: {}", config.fetch_worker_count);
    println!("  Process workers: {}", config.process_worker_count);
    println!("  Max attempts per URL: {}", config.max_retries);
    println!(
        "  Rate limit: {}/s (burst {})",
        config.rate_limit_per_second, config.burst_limit
    );

    println!("\nCategories ({}):", config.categories.len());
    for category in &config.categories {
        println!(
            "  - {} [{}] ({}, path {})",
            category.name, category.id, category.kind, category.path
        );
        for field in &category.data_fields {
            match &field.selector {
                FieldSelector::Css {
                    selector,
                    attribute: Some(attribute),
                } => println!("    * {}: css '{}' @{}", field.field_name, selector, attribute),
                FieldSelector::Css { selector, .. } => {
                    println!("    * {}: css '{}'", field.field_name, selector)
                }
                FieldSelector::JsonPath(path) => {
                    println!("    * {}: json '{}'", field.field_name, path)
                }
            }
        }
    }

    println!("\nWork Items:");
    for url in generate_urls(&config.base_url, config.link_count) {
        println!("  {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    let harvester = Harvester::new(config).context("failed to set up harvester")?;

    let report = harvester.run().await.context("harvest failed")?;
    print_report(&report);

    tracing::info!("Finished work");
    Ok(())
}
