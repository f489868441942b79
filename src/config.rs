//! Analyzer configuration.
//!
//! Settings come from an optional YAML file and are overridden by CLI flags
//! (which in turn may be fed from the environment). The API key is only ever
//! read from the flag or `OPENROUTER_API_KEY`; nothing identifying a
//! provider, model or credential is compiled in.
//!
//! ```yaml
//! api_url: https://openrouter.ai/api/v1
//! model: some-vendor/some-model
//! temperature: 0.5
//! timeout_secs: 60
//! max_retries: 3
//! referer: https://audit.example.org
//! app_title: Security Audit API
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing required setting `{0}` (set it in the config file or on the command line)")]
    Missing(&'static str),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Every setting optional; used for both the YAML file and CLI overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<usize>,
    pub referer: Option<String>,
    pub app_title: Option<String>,
}

impl PartialConfig {
    /// Fields set in `overrides` win over fields set in `self`.
    pub fn merge(self, overrides: PartialConfig) -> PartialConfig {
        PartialConfig {
            api_url: overrides.api_url.or(self.api_url),
            model: overrides.model.or(self.model),
            temperature: overrides.temperature.or(self.temperature),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            max_retries: overrides.max_retries.or(self.max_retries),
            referer: overrides.referer.or(self.referer),
            app_title: overrides.app_title.or(self.app_title),
        }
    }
}

/// Parse a YAML config document.
pub fn parse_config(yaml: &str) -> Result<PartialConfig, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(PartialConfig::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Read and parse a YAML config file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_config(path: impl AsRef<Path>) -> Result<PartialConfig, ConfigError> {
    let path = path.as_ref();
    let yaml = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let config = parse_config(&yaml)?;
    debug!(?config, "Loaded config file");
    Ok(config)
}

/// Fully resolved settings for the model client.
#[derive(Clone)]
pub struct AnalyzerConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub referer: Option<String>,
    pub app_title: Option<String>,
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("referer", &self.referer)
            .field("app_title", &self.app_title)
            .finish()
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

impl AnalyzerConfig {
    /// Resolve a merged partial config plus the API key into final settings.
    pub fn resolve(partial: PartialConfig, api_key: Option<String>) -> Result<Self, ConfigError> {
        let temperature = partial.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {temperature}"
            )));
        }
        let timeout_secs = partial.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".to_string()));
        }

        Ok(Self {
            api_url: required(partial.api_url, "api_url")?,
            api_key: required(api_key, "api_key")?,
            model: required(partial.model, "model")?,
            temperature,
            timeout_secs,
            max_retries: partial.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            referer: partial.referer,
            app_title: partial.app_title,
        })
    }
}
