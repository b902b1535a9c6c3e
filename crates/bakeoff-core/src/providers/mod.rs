use crate::model::Verdict;
use async_trait::async_trait;
use std::time::Duration;

pub mod openai;

/// One successful completion attempt, with the latency of the attempt that
/// produced it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub latency_seconds: f64,
}

/// External model provider. One call per generation attempt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, ProviderError>;
    fn provider_name(&self) -> &'static str;
}

/// Judge model collaborator. The scoring rubric is opaque: implementations
/// return two independent booleans and nothing downstream inspects how they
/// were produced.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn score(
        &self,
        judge_model: &str,
        prompt: &str,
        response: &str,
    ) -> Result<Verdict, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider call timed out")]
    Timeout,

    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("invalid provider response: {message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    /// Transient failures worth another attempt; API and parse failures are
    /// deterministic and fail fast.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited { .. } | Self::Network { .. }
        )
    }
}
