use super::{Completion, JudgeClient, ModelClient, ProviderError};
use crate::model::Verdict;
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

const JUDGE_SYSTEM_PROMPT: &str = "\
You are grading a tutoring response. Evaluate the response (in <response> \
delimiters) against the prompt it answers (in <prompt> delimiters). Output a \
JSON object with exactly two boolean keys: \"ok\" (the response correctly \
addresses the prompt) and \"other\" (the response satisfies the secondary \
quality criterion).";

pub struct OpenAiClient {
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            // Matches the generation settings the harness was tuned with.
            temperature: 0.25,
            max_tokens: 1000,
            client: reqwest::Client::new(),
        }
    }

    async fn chat(&self, body: serde_json::Value) -> Result<(String, f64), ProviderError> {
        let start = Instant::now();
        let resp = self
            .client
            .post(CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }
        if status.is_server_error() {
            return Err(ProviderError::Network {
                message: format!("server error {}", status),
            });
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                message: format!("body is not JSON: {}", e),
            }
        })?;
        let latency = start.elapsed().as_secs_f64();

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: "missing choices[0].message.content".into(),
            })?
            .to_string();

        Ok((text, latency))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, ProviderError> {
        let body = json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "n": 1,
        });

        let (text, latency_seconds) = self.chat(body).await?;
        Ok(Completion {
            text,
            latency_seconds,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl JudgeClient for OpenAiClient {
    async fn score(
        &self,
        judge_model: &str,
        prompt: &str,
        response: &str,
    ) -> Result<Verdict, ProviderError> {
        let user = format!(
            "<prompt>\n{}\n</prompt>\n\n<response>\n{}\n</response>",
            prompt, response
        );
        let body = json!({
            "model": judge_model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": JUDGE_SYSTEM_PROMPT },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "n": 1,
        });

        let (text, _latency) = self.chat(body).await?;
        parse_verdict(&text)
    }
}

fn parse_verdict(text: &str) -> Result<Verdict, ProviderError> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ProviderError::InvalidResponse {
            message: format!("judge output is not JSON: {}", e),
        })?;
    let get_bool = |key: &str| {
        json.get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ProviderError::InvalidResponse {
                message: format!("judge output missing boolean '{}'", key),
            })
    };
    Ok(Verdict {
        ok: get_bool("ok")?,
        other: get_bool("other")?,
    })
}

fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_parses_both_booleans() {
        let v = parse_verdict(r#"{"ok": true, "other": false}"#).unwrap();
        assert_eq!(
            v,
            Verdict {
                ok: true,
                other: false
            }
        );
    }

    #[test]
    fn verdict_rejects_missing_keys() {
        let err = parse_verdict(r#"{"ok": true}"#).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse { .. }));
    }
}
