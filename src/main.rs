//! Scrape-Bench main entry point
//!
//! This is the command-line interface for the Scrape-Bench extraction
//! benchmark.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use scrape_bench::compare::GroundTruth;
use scrape_bench::config::{
    compute_run_fingerprint, load_config, resolve_credentials, validate, validate_ground_truth_path,
    Config, Credentials,
};
use scrape_bench::crawler::FetchRegistry;
use scrape_bench::escalation::JudgeRegistry;
use scrape_bench::extract::ExtractorRegistry;
use scrape_bench::output::{print_summary, write_report, OutputFormat, RunParameters, RunReport};
use scrape_bench::pipeline::{
    load_domains, plan_from_store, plan_matrix, PlanFilter, RunMode, RunOptions, RunOutcome, Runner,
    UnitKey,
};
use scrape_bench::storage::{ArtifactStore, FsArtifactStore};
use scrape_bench::url::Domain;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Scrape-Bench: benchmark web-scraping extraction pipelines
///
/// Crawls company domains with interchangeable crawler backends, extracts
/// structured fields with LLM extractors, and scores the results against
/// curated ground truth. Every stage is cached so runs can be replayed.
#[derive(Parser, Debug)]
#[command(name = "scrape-bench")]
#[command(version)]
#[command(about = "Benchmark web-scraping extraction pipelines", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only show warnings and errors
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the benchmark over a domain list
    Run(RunArgs),

    /// Re-score cached artifacts without network access
    Reeval(ReevalArgs),

    /// Load and validate a configuration, then print it
    Validate {
        /// Path to TOML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

/// Options shared by `run` and `reeval`
#[derive(Args, Debug)]
struct CommonArgs {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Crawler ids to run (comma separated)
    #[arg(long, value_delimiter = ',')]
    crawlers: Vec<String>,

    /// Extractor ids to run (comma separated)
    #[arg(long, value_delimiter = ',')]
    extractors: Vec<String>,

    /// Put ambiguous fields to the judge panel
    #[arg(long)]
    escalate: bool,

    /// Report output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Report format: json, sqlite, markdown, csv or all
    #[arg(long, default_value = "json")]
    format: OutputFormat,

    /// Ground-truth JSON Lines file
    #[arg(long, value_name = "FILE")]
    ground_truth: Option<PathBuf>,

    /// Root directory of cached artifacts
    #[arg(long, value_name = "DIR")]
    artifacts: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// CSV file with a `domain` or `url` column
    #[arg(long, value_name = "CSV")]
    domains: Option<PathBuf>,

    /// A domain to benchmark (repeatable)
    #[arg(long = "domain", value_name = "DOMAIN")]
    domain: Vec<String>,

    /// Maximum sub-pages crawled per domain
    #[arg(long)]
    max_pages: Option<usize>,

    /// Do not persist intermediate artifacts
    #[arg(long)]
    no_save_intermediate: bool,

    /// Run-level timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct ReevalArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Domain to re-score, or ALL for every cached domain
    #[arg(long, value_name = "DOMAIN|ALL")]
    domain: String,

    /// Ask judges again even when cached votes exist
    #[arg(long)]
    force_judges: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run(args) => handle_run(args).await,
        Command::Reeval(args) => handle_reeval(args).await,
        Command::Validate { config } => handle_validate(config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("warn")
        } else {
            match verbose {
                0 => EnvFilter::new("scrape_bench=info,warn"),
                1 => EnvFilter::new("scrape_bench=debug,info"),
                _ => EnvFilter::new("scrape_bench=trace,debug"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_or_default(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Ok(Config::default())
        }
    }
}

/// Loads the configuration and applies the shared CLI overrides
fn prepare_config(common: &CommonArgs) -> Result<Config> {
    let mut config = load_or_default(common.config.as_ref())?;

    if !common.crawlers.is_empty() {
        config.run.crawlers = common.crawlers.clone();
    }
    if !common.extractors.is_empty() {
        config.run.extractors = common.extractors.clone();
    }
    if common.escalate {
        config.escalation.enabled = true;
    }
    if let Some(output) = &common.output {
        config.paths.output_dir = output.clone();
    }
    if let Some(ground_truth) = &common.ground_truth {
        config.paths.ground_truth = Some(ground_truth.clone());
    }
    if let Some(artifacts) = &common.artifacts {
        config.paths.artifact_root = artifacts.clone();
    }
    Ok(config)
}

fn load_ground_truth(config: &Config) -> Result<GroundTruth> {
    let path = validate_ground_truth_path(config)?;
    GroundTruth::load(path, &config.schema())
        .with_context(|| format!("Failed to load ground truth from {}", path.display()))
}

/// Cancels the run on Ctrl-C; in-flight units are marked failed
fn cancel_on_interrupt(runner: &Runner) {
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining units");
            cancel.cancel();
        }
    });
}

/// Handles `run`: crawl, extract and score the domain matrix
async fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = prepare_config(&args.common)?;
    if let Some(max_pages) = args.max_pages {
        config.run.max_pages = max_pages;
    }
    if args.no_save_intermediate {
        config.run.save_intermediate = false;
    }
    if args.timeout.is_some() {
        config.run.timeout_secs = args.timeout;
    }
    if let Some(domains) = &args.domains {
        config.paths.domains = Some(domains.clone());
    }
    validate(&config)?;

    // Preconditions: nothing runs unless all of these hold
    let ground_truth = load_ground_truth(&config)?;
    let domains = collect_domains(&config, &args.domain)?;
    let credentials = resolve_credentials(&config)?;

    let fetchers = FetchRegistry::from_config(&config, &credentials)?;
    let extractors = ExtractorRegistry::from_config(&config, &credentials)?;
    let judges = JudgeRegistry::from_config(&config, &credentials)?;

    let units = plan_matrix(&domains, &config.run.crawlers, &config.run.extractors);
    tracing::info!(
        "Domains: {}, crawlers: {}, extractors: {}",
        domains.len(),
        config.run.crawlers.join(","),
        config.run.extractors.join(",")
    );

    let options = RunOptions::from_config(&config, RunMode::Live);
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.paths.artifact_root));
    let runner = Runner::new(store, config.schema(), ground_truth, options)
        .with_fetchers(fetchers)
        .with_extractors(extractors)
        .with_judges(judges);
    cancel_on_interrupt(&runner);

    let outcome = runner.run(units).await;
    finish(&config, runner.options(), &outcome, args.common.format)
}

fn collect_domains(config: &Config, cli_domains: &[String]) -> Result<Vec<Domain>> {
    let mut domains = Vec::new();
    for raw in cli_domains {
        domains.push(Domain::parse(raw).with_context(|| format!("Invalid domain '{}'", raw))?);
    }
    if let Some(path) = &config.paths.domains {
        domains.extend(load_domains(path)?);
    }
    if domains.is_empty() {
        bail!("No domains given: pass --domain or --domains, or set paths.domains");
    }
    Ok(domains)
}

/// Handles `reeval`: replay cached artifacts only
async fn handle_reeval(args: ReevalArgs) -> Result<()> {
    let config = prepare_config(&args.common)?;
    validate(&config)?;
    let ground_truth = load_ground_truth(&config)?;

    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.paths.artifact_root));
    let units = plan_replay(&config, &args, store.as_ref())?;
    if units.is_empty() {
        bail!(
            "No cached extractions found under {}",
            config.paths.artifact_root.display()
        );
    }

    // Judges are only called when forced; cached votes need the ids alone
    let credentials = if config.escalation.enabled && args.force_judges {
        let mut judges_only = config.clone();
        judges_only.run.crawlers.clear();
        judges_only.run.extractors.clear();
        resolve_credentials(&judges_only)?
    } else {
        Credentials::new()
    };
    let judges = JudgeRegistry::from_config(&config, &credentials)?;

    let mut options = RunOptions::from_config(&config, RunMode::Replay);
    options.force_judges = options.force_judges || args.force_judges;

    let runner = Runner::new(store, config.schema(), ground_truth, options).with_judges(judges);
    cancel_on_interrupt(&runner);

    let outcome = runner.run(units).await;
    finish(&config, runner.options(), &outcome, args.common.format)
}

fn plan_replay(
    config: &Config,
    args: &ReevalArgs,
    store: &dyn ArtifactStore,
) -> Result<Vec<UnitKey>> {
    let mut filter = PlanFilter {
        domain: None,
        crawlers: args.common.crawlers.clone(),
        extractors: args.common.extractors.clone(),
    };

    if args.domain.eq_ignore_ascii_case("all") {
        return Ok(plan_from_store(store, &filter)?);
    }

    let domain = Domain::parse(&args.domain)
        .with_context(|| format!("Invalid domain '{}'", args.domain))?;
    filter.domain = Some(domain.clone());
    let units = plan_from_store(store, &filter)?;
    if !units.is_empty() {
        return Ok(units);
    }

    // Nothing cached: list the configured units so they are reported as failed
    Ok(plan_matrix(&[domain], &config.run.crawlers, &config.run.extractors))
}

/// Builds, writes and prints the report
fn finish(
    config: &Config,
    options: &RunOptions,
    outcome: &RunOutcome,
    format: OutputFormat,
) -> Result<()> {
    let fingerprint = compute_run_fingerprint(config);
    let parameters = RunParameters::new(config, options);
    let report = RunReport::from_outcome(outcome, parameters, &fingerprint);

    let output_dir = &config.paths.output_dir;
    let written = write_report(&report, output_dir, format)
        .with_context(|| format!("Failed to write report to {}", output_dir.display()))?;

    print_summary(&report);
    println!();
    for path in written {
        println!("✓ Report written to: {}", path.display());
    }
    Ok(())
}

/// Handles `validate`: prints the effective configuration
fn handle_validate(path: Option<PathBuf>) -> Result<()> {
    let config = load_or_default(path.as_ref())?;
    validate(&config)?;

    println!("=== Scrape-Bench Configuration ===\n");

    println!("Run:");
    println!("  Crawlers: {}", config.run.crawlers.join(", "));
    println!("  Extractors: {}", config.run.extractors.join(", "));
    println!("  Max pages: {}", config.run.max_pages);
    if !config.run.pages.is_empty() {
        println!("  Preferred pages: {}", config.run.pages.join(", "));
    }
    println!("  Save intermediate: {}", config.run.save_intermediate);
    if let Some(timeout) = config.run.timeout_secs {
        println!("  Timeout: {}s", timeout);
    }

    println!("\nConcurrency:");
    println!(
        "  Fetches per crawler: {}",
        config.concurrency.fetch_per_crawler
    );
    println!("  Extract and judge calls: {}", config.concurrency.extract);

    println!("\nEscalation:");
    if config.escalation.enabled {
        println!("  Judges: {}", config.escalation.judges.join(", "));
    } else {
        println!("  Disabled");
    }

    println!("\nPaths:");
    println!("  Artifacts: {}", config.paths.artifact_root.display());
    println!("  Output: {}", config.paths.output_dir.display());
    match &config.paths.ground_truth {
        Some(path) => println!("  Ground truth: {}", path.display()),
        None => println!("  Ground truth: (not set)"),
    }

    let schema = config.schema();
    println!("\nSchema ({} fields):", schema.len());
    for field in schema.fields() {
        println!("  - {} ({})", field.name, field.kind);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Run fingerprint: {}", compute_run_fingerprint(&config));
    Ok(())
}
