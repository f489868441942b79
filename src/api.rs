//! LLM API interaction with exponential backoff retry logic.
//!
//! This module provides the one outbound call the analyzer makes: send a
//! system prompt and a user prompt to an OpenAI-compatible chat completion
//! endpoint and get the reply text back.
//!
//! # Architecture
//!
//! - [`Complete`]: Core trait defining async prompt completion
//! - [`ChatClient`]: HTTP implementation against `{api_url}/chat/completions`
//! - [`RetryComplete`]: Decorator that adds retry logic to any `Complete` implementation
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (timeouts, transport errors, 429, 5xx)
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::AnalyzerConfig;
use rand::{Rng, rng};
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Why a completion request failed.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("model API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API did not answer within {0:?}")]
    Timeout(StdDuration),
    #[error("model API returned status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("model API response missing choices[0].message.content")]
    MissingContent,
}

impl UpstreamError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Timeout(_) => true,
            UpstreamError::Http(e) => !e.is_decode() && !e.is_builder(),
            UpstreamError::Status { code, .. } => *code == 429 || *code >= 500,
            UpstreamError::MissingContent => false,
        }
    }
}

/// Trait for async prompt completion.
///
/// Implementors send a system prompt and a user prompt to a model and
/// return the raw reply text.
pub trait Complete {
    /// Send both prompts and receive the model's reply.
    ///
    /// # Arguments
    ///
    /// * `system` - Instructions that fix the reply format
    /// * `user` - The prompt built from the caller's input
    ///
    /// # Returns
    ///
    /// The raw reply text, or an [`UpstreamError`] describing why the call failed.
    async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError>;
}

/// Client for an OpenAI-compatible chat completion API (OpenRouter, OpenAI, local servers).
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: StdDuration,
    referer: Option<String>,
    app_title: Option<String>,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatClient {
    /// Build a client with the configured request timeout.
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved analyzer settings
    ///
    /// # Returns
    ///
    /// The client, or [`UpstreamError::Http`] if the TLS backend fails to initialise.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, UpstreamError> {
        let timeout = StdDuration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
            referer: config.referer.clone(),
            app_title: config.app_title.clone(),
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Http(e)
        }
    }
}

impl Complete for ChatClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let t0 = Instant::now();
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
        });

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.app_title {
            request = request.header("X-Title", title);
        }

        let resp = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                status = status.as_u16(),
                "Model API returned an error status"
            );
            return Err(UpstreamError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let json: Value = resp.json().await.map_err(|e| self.map_send_error(e))?;
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or(UpstreamError::MissingContent)?
            .to_string();

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = text.len(),
            "Model API call succeeded"
        );
        Ok(text)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Complete`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryComplete<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryComplete<T>
where
    T: Complete,
{
    /// Create a new retry wrapper around an existing [`Complete`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying client to wrap
    /// * `max_retries` - Maximum number of retry attempts
    /// * `base_delay` - Initial delay between retries (1 second in production)
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryComplete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryComplete")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Complete for RetryComplete<T>
where
    T: Complete + fmt::Debug,
{
    #[instrument(level = "info", skip_all)]
    async fn complete(&self, system: &str, user: &str) -> Result<String, UpstreamError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.complete(system, user).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            transient = e.is_transient(),
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "complete() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "complete() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the retrying chat client described by `config`.
///
/// This is the primary entry point for the analyzer: the returned client
/// retries transient failures up to `config.max_retries` times.
///
/// # Arguments
///
/// * `config` - Resolved analyzer settings (endpoint, key, model, timeout)
///
/// # Returns
///
/// A [`RetryComplete`] around a [`ChatClient`], or an error if the HTTP
/// client cannot be constructed.
///
/// # Retry Behavior
///
/// - Exponential backoff: 1s, 2s, 4s, ... (capped at 30s)
/// - Random jitter added to prevent thundering herd
/// - Auth errors and malformed payloads are returned immediately
pub fn build_client(config: &AnalyzerConfig) -> Result<RetryComplete<ChatClient>, UpstreamError> {
    let client = ChatClient::from_config(config)?;
    Ok(RetryComplete::new(
        client,
        config.max_retries,
        StdDuration::from_secs(1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AnalyzerConfig {
        AnalyzerConfig {
            api_url: format!("{}/api/v1/", server.uri()),
            api_key: "test-key".to_string(),
            model: "test/model".to_string(),
            temperature: 0.5,
            timeout_secs: 1,
            max_retries: 2,
            referer: Some("http://localhost:8000".to_string()),
            app_title: Some("Security Audit API".to_string()),
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": text } } ] })
    }

    #[tokio::test]
    async fn test_chat_client_sends_prompts_and_reads_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(header("x-title", "Security Audit API"))
            .and(body_partial_json(json!({
                "model": "test/model",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "usr" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("<SUMMARY>ok</SUMMARY>")))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::from_config(&config_for(&server)).unwrap();
        let text = client.complete("sys", "usr").await.unwrap();
        assert_eq!(text, "<SUMMARY>ok</SUMMARY>");
    }

    #[tokio::test]
    async fn test_missing_content_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = ChatClient::from_config(&config_for(&server)).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, UpstreamError::MissingContent));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_retry_recovers_from_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("done")))
            .mount(&server)
            .await;

        let inner = ChatClient::from_config(&config_for(&server)).unwrap();
        let client = RetryComplete::new(inner, 2, StdDuration::from_millis(1));
        assert_eq!(client.complete("s", "u").await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let inner = ChatClient::from_config(&config_for(&server)).unwrap();
        let client = RetryComplete::new(inner, 3, StdDuration::from_millis(1));
        let err = client.complete("s", "u").await.unwrap_err();
        match err {
            UpstreamError::Status { code, body } => {
                assert_eq!(code, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_slow_server_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("late"))
                    .set_delay(StdDuration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = ChatClient::from_config(&config_for(&server)).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_status_transience() {
        let status = |code| UpstreamError::Status {
            code,
            body: String::new(),
        };
        assert!(status(429).is_transient());
        assert!(status(502).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(403).is_transient());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = AnalyzerConfig {
            api_url: "http://localhost/v1".to_string(),
            api_key: "sk-very-secret".to_string(),
            model: "m".to_string(),
            temperature: 0.5,
            timeout_secs: 5,
            max_retries: 0,
            referer: None,
            app_title: None,
        };
        let client = build_client(&config).unwrap();
        let printed = format!("{:?} {:?}", client, client.inner);
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("http://localhost/v1/chat/completions"));
    }
}
