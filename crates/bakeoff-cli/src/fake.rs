//! Deterministic offline provider for smoke tests and local dry runs.

use async_trait::async_trait;
use bakeoff_core::model::Verdict;
use bakeoff_core::providers::{Completion, JudgeClient, ModelClient, ProviderError};

pub struct FakeClient;

#[async_trait]
impl ModelClient for FakeClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, ProviderError> {
        Ok(Completion {
            text: format!("hello from {} :: {}", model, prompt),
            latency_seconds: 0.01,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[async_trait]
impl JudgeClient for FakeClient {
    async fn score(
        &self,
        _judge_model: &str,
        _prompt: &str,
        response: &str,
    ) -> Result<Verdict, ProviderError> {
        Ok(Verdict {
            ok: !response.contains("fail"),
            other: true,
        })
    }
}
