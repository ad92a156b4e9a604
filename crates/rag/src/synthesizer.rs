//! Answer synthesis boundary.
//!
//! [`AnswerSynthesizer`] is the narrow interface the pipeline talks to.
//! [`SynthesisGateway`] wraps one with the retry policy: a deadline per
//! attempt, bounded retries of transient failures with exponential
//! backoff, and prompt abandonment when the caller cancels.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use support_core::config::SynthesisConfig;
use support_core::{AppError, AppResult};
use support_llm::{LlmClient, LlmRequest};
use support_prompt::SynthesisRequest;
use tokio_util::sync::CancellationToken;

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Turns a synthesis request into raw answer text.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// One attempt. Fails with `SynthesisUnavailable` on transport or auth
    /// failure and `SynthesisTimeout` when `timeout` elapses.
    async fn synthesize(&self, request: &SynthesisRequest, timeout: Duration) -> AppResult<String>;
}

/// [`AnswerSynthesizer`] backed by an [`LlmClient`].
pub struct LlmSynthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmSynthesizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: SynthesisConfig::default().temperature,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn llm_request(&self, request: &SynthesisRequest) -> LlmRequest {
        let llm_request = LlmRequest::new(request.user_prompt.clone(), self.model.clone())
            .with_system(request.system_prompt.clone())
            .with_temperature(self.temperature);

        match self.max_tokens {
            Some(max_tokens) => llm_request.with_max_tokens(max_tokens),
            None => llm_request,
        }
    }
}

#[async_trait]
impl AnswerSynthesizer for LlmSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest, timeout: Duration) -> AppResult<String> {
        let llm_request = self.llm_request(request);

        let response = tokio::time::timeout(timeout, self.client.complete(&llm_request))
            .await
            .map_err(|_| AppError::SynthesisTimeout(timeout))??;

        tracing::debug!(
            provider = self.client.provider_name(),
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Synthesis completed"
        );

        Ok(response.content)
    }
}

/// Bounded retry policy for the synthesis boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            attempt_timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Sleep before attempt `attempt + 1`, doubling from the initial delay.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default())
    }
}

/// Synthesizer wrapped with the retry policy and cancellation.
pub struct SynthesisGateway {
    synthesizer: Arc<dyn AnswerSynthesizer>,
    policy: RetryPolicy,
}

impl SynthesisGateway {
    pub fn new(synthesizer: Arc<dyn AnswerSynthesizer>, policy: RetryPolicy) -> Self {
        Self {
            synthesizer,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Synthesize with retries.
    ///
    /// Non-transient failures are returned at once. When every attempt
    /// fails transiently the result is `SynthesisUnavailable` carrying the
    /// last failure. Cancellation wins over both, during a call or a
    /// backoff sleep.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> AppResult<String> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                result = self.synthesizer.synthesize(request, self.policy.attempt_timeout) => result,
            };

            match result {
                Ok(answer) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Synthesis succeeded after retry");
                    }
                    return Ok(answer);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if attempt < max_attempts {
                        let delay = self.policy.backoff_after(attempt);
                        tracing::warn!(
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            "Synthesis attempt failed, retrying: {}",
                            e
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(AppError::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    } else {
                        tracing::warn!(attempt, "Synthesis attempt failed: {}", e);
                    }
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());

        Err(AppError::SynthesisUnavailable {
            reason: format!("gave up after {} attempts: {}", max_attempts, reason),
            transient: true,
        })
    }
}
