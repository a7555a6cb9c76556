//! rustskgc - Scientific Knowledge Graph Construction
//!
//! Extracts topics from publication metadata with a two-role LLM dialogue and
//! evaluates them against a gold standard and the CSO classifier baseline.
//!
//! ## Usage
//!
//! ### Corpus file
//! ```bash
//! rustskgc run --input corpus.json --select testing
//! ```
//!
//! ### Direct entry
//! ```bash
//! rustskgc run --title "..." --keywords "a, b" --abstract "..." --gold "x, y"
//! ```
//!
//! ### Re-print a saved evaluation
//! ```bash
//! rustskgc report output/20240601_120000_skgc/skgc_results.json
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use rustskgc::aggregate::summarize;
use rustskgc::gateway::{Gateway, GatewayConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use rustskgc::pipeline::Pipeline;
use rustskgc::prompts::PromptSet;
use rustskgc::publication::{self, Publication, Selection};
use rustskgc::report::{self, ReportSink};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Scientific Knowledge Graph Construction - LLM topic extraction and evaluation
#[derive(Parser)]
#[command(name = "rustskgc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and evaluate topics for a set of publications
    Run(RunArgs),

    /// Re-print the evaluation report of a saved results file
    Report {
        /// Results JSON written by `run`
        results: PathBuf,

        /// Also write the report to this file
        #[arg(long)]
        report_file: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Corpus JSON file (object keyed by record ID)
    #[arg(short, long, conflicts_with = "title")]
    input: Option<PathBuf>,

    /// Which corpus records to process: all, training, testing, one:N
    #[arg(long, default_value = "all", value_parser = parse_selection)]
    select: Selection,

    // === Direct entry ===
    /// Publication title
    #[arg(long)]
    title: Option<String>,

    /// Author keywords, comma-separated
    #[arg(long, default_value = "")]
    keywords: String,

    /// Publication abstract
    #[arg(long = "abstract", default_value = "")]
    abstract_text: String,

    /// CSO classifier result, comma-separated
    #[arg(long, default_value = "")]
    csoc: String,

    /// Gold standard annotation, comma-separated
    #[arg(long, default_value = "")]
    gold: String,

    // === Pipeline ===
    /// Directory holding the four prompt template YAML files
    #[arg(long, default_value = "templates")]
    templates: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Seconds to wait before every LLM call (tokens-per-minute budget)
    #[arg(long, default_value = "10")]
    delay_secs: u64,

    /// Chat model for both roles
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Do not print the agent conversations
    #[arg(long)]
    skip_conversations: bool,
}

fn parse_selection(s: &str) -> std::result::Result<Selection, String> {
    s.parse().map_err(|e: rustskgc::SkgcError| e.to_string())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Report {
            results,
            report_file,
        } => print_saved_report(&results, report_file.as_deref()),
    }
}

// ============================================================================
// Run
// ============================================================================

fn read_publications(args: &RunArgs) -> Result<Vec<Publication>> {
    if let Some(input) = &args.input {
        let corpus = publication::load_corpus(input)
            .with_context(|| format!("Failed to read corpus {}", input.display()))?;
        let total = corpus.len();
        let selected = publication::select(corpus, args.select)?;
        println!("{} publications read, {} selected.", total, selected.len());
        return Ok(selected);
    }

    let title = args.title.as_deref().unwrap_or_default();
    let entry = Publication::from_entry(
        title,
        &args.keywords,
        &args.abstract_text,
        &args.csoc,
        &args.gold,
    );
    if !entry.has_content() {
        anyhow::bail!("Provide --input or at least one of --title, --keywords, --abstract");
    }
    Ok(vec![entry])
}

async fn run_pipeline(args: RunArgs) -> Result<()> {
    let mut publications = read_publications(&args)?;
    if publications.is_empty() {
        anyhow::bail!("No publications selected");
    }

    for (idx, p) in publications.iter().enumerate() {
        println!("Publication {} of {}: {}", idx + 1, publications.len(), p.title);
    }

    let config = GatewayConfig {
        base_url: args.base_url.clone(),
        model: args.model.clone(),
        call_delay: Duration::from_secs(args.delay_secs),
        ..Default::default()
    };
    let gateway = Gateway::from_env(config)?;
    let prompts = PromptSet::load_dir(&args.templates);

    // Create output folder
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_folder = args.output.join(format!("{}_skgc", timestamp));
    std::fs::create_dir_all(&output_folder).context("Failed to create output directory")?;
    println!("Output folder: {}", output_folder.display());

    println!("\n--- Topic extraction and evaluation ---");
    let ledgers = Pipeline::new(&gateway, &prompts)
        .run(&mut publications)
        .await;

    if !args.skip_conversations {
        let mut console = ReportSink::console();
        report::write_conversations(&mut console, &ledgers)?;
    }

    let summary = summarize(&publications);
    {
        let report_path = output_folder.join("evaluation_details.txt");
        let mut sink = ReportSink::console_and_file(&report_path)?;
        report::write_evaluation_details(&mut sink, &publications, &summary)?;
    }

    let results_path = output_folder.join("skgc_results.json");
    publication::save_records(&results_path, &publications)
        .context("Failed to save results JSON")?;
    report::save_metrics_csv(&output_folder.join("metrics.csv"), &publications)
        .context("Failed to save metrics CSV")?;

    let usage = gateway.token_usage();
    info!(
        calls = gateway.call_count(),
        total_tokens = usage.total_tokens,
        "Run complete"
    );
    println!("\n✓ Pipeline complete. Results in: {}", output_folder.display());
    Ok(())
}

// ============================================================================
// Report
// ============================================================================

fn print_saved_report(results: &Path, report_file: Option<&Path>) -> Result<()> {
    let publications = publication::load_records(results)
        .with_context(|| format!("Failed to read results {}", results.display()))?;
    let summary = summarize(&publications);
    let mut sink = ReportSink::open(report_file)?;
    report::write_evaluation_details(&mut sink, &publications, &summary)?;
    sink.flush()?;
    Ok(())
}
