//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Model settings can be provided via flags, environment variables or a
//! YAML config file (flags win).

use crate::config::PartialConfig;
use crate::scrapers::lesoleil::POLITICS_URL;
use clap::{Args, Parser, Subcommand};
use std::fmt;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Analyse a questionnaire (key taken from OPENROUTER_API_KEY)
/// audit_news analyze -i responses.json -c config.yaml
///
/// # Scrape election coverage and keep a copy on disk
/// audit_news scrape -o ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse security audit answers with an LLM and print the structured report
    Analyze(AnalyzeArgs),
    /// Scrape election articles from the Le Soleil politics section
    Scrape(ScrapeArgs),
    /// Print a health status line
    Health,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// JSON file with the question/answer pairs, or "-" for stdin
    #[arg(short, long)]
    pub input: String,

    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// API key for the model provider
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API (e.g. https://openrouter.ai/api/v1)
    #[arg(long, env = "AUDIT_API_URL")]
    pub api_url: Option<String>,

    /// Model identifier
    #[arg(long, env = "AUDIT_MODEL")]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries for transient API failures
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Also write the report under this directory
    #[arg(short, long)]
    pub output_dir: Option<String>,
}

impl fmt::Debug for AnalyzeArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeArgs")
            .field("input", &self.input)
            .field("config", &self.config)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl AnalyzeArgs {
    /// Settings given on the command line, to be layered over the config file.
    pub fn overrides(&self) -> PartialConfig {
        PartialConfig {
            api_url: self.api_url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            referer: None,
            app_title: None,
        }
    }
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Section page to index
    #[arg(long, default_value = POLITICS_URL)]
    pub url: String,

    /// Also write the articles under this directory
    #[arg(short, long)]
    pub output_dir: Option<String>,
}
