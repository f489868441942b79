//! # Audit News
//!
//! Two small services behind one CLI:
//!
//! - **analyze**: forwards security audit question/answer pairs to an
//!   OpenAI-compatible LLM and parses the tagged reply into a structured
//!   report (audit type, score, strengths, weaknesses, recommendations,
//!   summary).
//! - **scrape**: fetches the Le Soleil politics section and keeps the
//!   articles that cover presidential or legislative elections.
//!
//! ## Usage
//!
//! ```sh
//! OPENROUTER_API_KEY=... audit_news analyze -i responses.json -c config.yaml
//! audit_news scrape -o ./out
//! ```
//!
//! JSON results go to stdout; logs go to stderr.

use clap::Parser;
use serde_json::json;
use std::error::Error;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analyzer;
mod api;
mod cli;
mod config;
mod models;
mod outputs;
mod scrapers;
mod utils;

use analyzer::analyze_responses;
use api::build_client;
use cli::{AnalyzeArgs, Cli, Command, ScrapeArgs};
use config::{AnalyzerConfig, PartialConfig, load_config};
use models::AuditRequest;
use outputs::json::{report_file_stem, to_pretty_json, write_dated};
use scrapers::lesoleil::LeSoleilScraper;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let result = match args.command {
        Command::Analyze(args) => run_analyze(args).await,
        Command::Scrape(args) => run_scrape(args).await,
        Command::Health => {
            let status = json!({
                "status": "ok",
                "message": "Security audit analysis service operational",
            });
            println!("{status}");
            Ok(())
        }
    };

    let elapsed = start_time.elapsed();
    info!(?elapsed, millis = elapsed.as_millis() as u64, "Execution complete");
    result
}

/// Read the request body from a file, or stdin when `path` is "-".
async fn read_input(path: &str) -> Result<String, Box<dyn Error>> {
    if path == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(buf)
    } else {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

#[instrument(level = "info", skip_all, fields(input = %args.input))]
async fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let file_config = match &args.config {
        Some(path) => load_config(path).await?,
        None => PartialConfig::default(),
    };
    let config = AnalyzerConfig::resolve(file_config.merge(args.overrides()), args.api_key.clone())?;
    info!(api_url = %config.api_url, model = %config.model, "Resolved analyzer configuration");

    if let Some(dir) = &args.output_dir {
        ensure_writable_dir(dir).await?;
    }

    let raw = read_input(&args.input).await?;
    let responses = serde_json::from_str::<AuditRequest>(&raw)?.into_responses();
    if responses.is_empty() {
        warn!("No question/answer pairs supplied; the model will only see the instructions");
    }

    let client = build_client(&config)?;
    let report = analyze_responses(&client, &responses).await;
    println!("{}", to_pretty_json(&report)?);

    if let Some(dir) = &args.output_dir {
        write_dated(&report, dir, &report_file_stem()).await?;
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(report.error.unwrap_or_else(|| "analysis failed".to_string()).into())
    }
}

#[instrument(level = "info", skip_all, fields(url = %args.url))]
async fn run_scrape(args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = &args.output_dir {
        ensure_writable_dir(dir).await?;
    }

    let scraper = LeSoleilScraper::new(&args.url)?;
    let articles = scraper.scrape().await?;
    println!("{}", to_pretty_json(&articles)?);

    if let Some(dir) = &args.output_dir {
        write_dated(&articles, dir, "election_articles").await?;
    }
    Ok(())
}
