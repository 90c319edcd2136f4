//! LLM judgment of whether a matched test case covers its requirement.

use std::sync::Arc;
use std::time::{Duration, Instant};

use stlc_llm::provider::StopReason;
use stlc_llm::{CompletionRequest, LlmError, LlmProvider};

use crate::config::StlcCfg;
use crate::error::ValidationError;
use crate::prompt::build_judgment_prompt;

/// Retries after the first attempt.
pub const MAX_RETRIES: u32 = 1;

pub struct JudgmentService {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
    retry_delay: Duration,
}

impl JudgmentService {
    pub fn new(llm: Arc<dyn LlmProvider>, max_tokens: u32, temperature: f32, retry_delay: Duration) -> Self {
        Self { llm, max_tokens, temperature, retry_delay }
    }

    pub fn from_cfg(llm: Arc<dyn LlmProvider>, cfg: &StlcCfg) -> Self {
        Self::new(llm, cfg.judge_max_tokens, cfg.judge_temperature, cfg.judge_retry_delay())
    }

    /// Verdict text for one requirement/test-case pair. Transient failures
    /// (unreachable backend, rate limit, empty or malformed reply) are retried
    /// once after `retry_delay`; a rejected request (`RequestFailed`, e.g. a
    /// 4xx) is not. Either way the row ends in `JudgmentUnavailable`.
    pub async fn judge(&self, requirement: &str, matched_test_case: &str) -> Result<String, ValidationError> {
        let prompt = build_judgment_prompt(requirement, matched_test_case);
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            match self.judge_once(&prompt).await {
                Ok(verdict) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = self.llm.name(),
                            attempt,
                            "judgment succeeded after retry"
                        );
                    }
                    return Ok(verdict);
                }
                Err(e) => {
                    if !e.is_transient() {
                        last_error = Some(e);
                        break;
                    }
                    if attempt < MAX_RETRIES {
                        let delay = self.retry_delay * 2u32.pow(attempt);
                        tracing::warn!(
                            provider = self.llm.name(),
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "judgment failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_else(|| "no attempts made".into());
        tracing::error!(provider = self.llm.name(), error = %reason, "judgment unavailable");
        Err(ValidationError::JudgmentUnavailable(reason))
    }

    async fn judge_once(&self, prompt: &str) -> Result<String, LlmError> {
        let start = Instant::now();
        let request = CompletionRequest::prompt(None, prompt, self.max_tokens, self.temperature);
        let response = self.llm.complete(request).await?;
        let verdict = response.content.trim().to_owned();
        if verdict.is_empty() {
            return Err(LlmError::InvalidResponse("empty verdict".into()));
        }
        if response.stop_reason == StopReason::MaxTokens {
            tracing::warn!(max_tokens = self.max_tokens, "verdict truncated at token limit");
        }
        tracing::debug!(
            provider = self.llm.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            output_tokens = response.output_tokens,
            "verdict generated"
        );
        Ok(verdict)
    }
}
