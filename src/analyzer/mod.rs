//! Security audit analysis through an LLM.
//!
//! The pipeline is:
//! 1. **Detect**: classify the questionnaire by security domain ([`detect`])
//! 2. **Prompt**: render the question/answer pairs into a prompt ([`prompt`])
//! 3. **Complete**: send system + user prompt to the model ([`crate::api`])
//! 4. **Parse**: turn the tagged reply into a [`Report`] ([`parse`])
//!
//! A failed model call never escapes as an error; it becomes an error
//! [`Report`] so callers always get the same shape back.

pub mod detect;
pub mod parse;
pub mod prompt;

use crate::api::Complete;
use crate::models::{Report, ResponseMap};
use crate::utils::truncate_for_log;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Analyse a questionnaire with the given model client.
#[instrument(level = "info", skip_all, fields(questions = responses.len()))]
pub async fn analyze_responses<C: Complete>(client: &C, responses: &ResponseMap) -> Report {
    let t0 = Instant::now();
    let user_prompt = prompt::build_prompt(responses);

    match client.complete(prompt::SYSTEM_PROMPT, &user_prompt).await {
        Ok(analysis) => {
            debug!(response_preview = %truncate_for_log(&analysis, 300), "Model reply received");
            let report = parse::parse_analysis(&analysis);
            info!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                audit_type = %report.audit_type,
                score = report.evaluation.score,
                "Audit analysis complete"
            );
            report
        }
        Err(e) => {
            error!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Model call failed; returning error report");
            Report::failure(e.to_string())
        }
    }
}
