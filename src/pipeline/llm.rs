//! LLM interaction: build one stage's messages and call the provider.
//!
//! This module turns one stage's prompt into one [`StageResult`]. It is
//! intentionally thin: all prompt wording lives in [`crate::prompts`] and the
//! wire format lives in the `edgequake-llm` provider, so neither can change
//! the timeout or retry behaviour here.
//!
//! ## Retry Strategy
//!
//! Each attempt is bounded by `api_timeout_secs`. A failed attempt is retried
//! at most once (`max_retries`, default 1) after `retry_backoff_ms`. Errors
//! whose [`edgequake_llm::RetryStrategy`] says another call cannot help (a
//! rejected key, an invalid request) are not retried. A blank answer counts
//! as a failed attempt. When the budget is spent the stage fails and, with
//! it, the run: there is no partial report.

use crate::config::ReviewConfig;
use crate::error::{LupiaError, ModelError};
use crate::output::{StageKind, StageResult};
use crate::prompts::profile_for;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse};
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

/// What the model answered, reduced to what a stage keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl From<LLMResponse> for ModelResponse {
    fn from(response: LLMResponse) -> Self {
        Self {
            text: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        }
    }
}

/// Messages for `stage`: its reviewer persona as the system message, then
/// `user_prompt`.
pub fn build_messages(stage: StageKind, user_prompt: String) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(profile_for(stage).system_prompt()),
        ChatMessage::user(user_prompt),
    ]
}

/// Build `CompletionOptions` from the review config.
fn build_options(config: &ReviewConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Delay before retry number `retry` (1-based).
fn backoff_ms(config: &ReviewConfig, retry: u32) -> u64 {
    let factor = 2u64.checked_pow(retry.saturating_sub(1)).unwrap_or(u64::MAX);
    config.retry_backoff_ms.saturating_mul(factor)
}

/// One call, bounded by the configured timeout. Blank text is a failure.
async fn attempt(
    provider: &dyn LLMProvider,
    messages: &[ChatMessage],
    options: &CompletionOptions,
    config: &ReviewConfig,
) -> Result<ModelResponse, ModelError> {
    let limit = Duration::from_secs(config.api_timeout_secs);
    match timeout(limit, provider.chat(messages, Some(options))).await {
        Ok(Ok(response)) if response.content.trim().is_empty() => Err(ModelError::EmptyResponse),
        Ok(Ok(response)) => Ok(response.into()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(ModelError::Timeout {
            secs: config.api_timeout_secs,
        }),
    }
}

/// Run one stage to completion.
///
/// Returns the first successful, non-blank answer verbatim. After
/// `1 + max_retries` failed attempts (or the first non-retryable one) the
/// stage fails with [`LupiaError::ModelInvocation`] carrying the last error.
pub async fn run_stage(
    provider: &dyn LLMProvider,
    stage: StageKind,
    user_prompt: String,
    config: &ReviewConfig,
) -> Result<StageResult, LupiaError> {
    let messages = build_messages(stage, user_prompt);
    let options = build_options(config);
    let start = Instant::now();

    if let Some(cb) = &config.progress_callback {
        cb.on_stage_start(stage);
    }
    info!(
        "Stage {}: calling {} ({})",
        stage,
        provider.name(),
        provider.model()
    );

    let mut attempts = 0u32;
    let mut last_err = ModelError::EmptyResponse;

    for retry in 0..=config.max_retries {
        if retry > 0 {
            let backoff = backoff_ms(config, retry);
            warn!(
                "Stage {}: retry {}/{} after {}ms",
                stage, retry, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }
        attempts += 1;

        match attempt(provider, &messages, &options, config).await {
            Ok(response) => {
                let duration = start.elapsed();
                debug!(
                    "Stage {}: {} input tokens, {} output tokens, {:?}",
                    stage, response.prompt_tokens, response.completion_tokens, duration
                );
                if let Some(cb) = &config.progress_callback {
                    cb.on_stage_complete(stage, response.text.chars().count());
                }
                return Ok(StageResult {
                    stage,
                    output_text: response.text,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    attempts,
                });
            }
            Err(e) => {
                warn!("Stage {}: attempt {} failed: {}", stage, attempts, e);
                let retryable = e.is_retryable();
                last_err = e;
                if !retryable {
                    break;
                }
            }
        }
    }

    let detail = last_err.to_string();
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_error(stage, &detail);
    }
    Err(LupiaError::ModelInvocation {
        stage,
        attempts,
        detail,
    })
}
