//! Language model access for the AI assessor

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{AssessError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub total_tokens: u32,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;

    fn model_name(&self) -> &str;
}

/// Any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Serialize, Deserialize)]
struct Message {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

impl OpenAiCompatibleProvider {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssessError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let body = json!({
            "model": self.model,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": {"type": "json_object"},
            "messages": [
                Message { role: "system".into(), content: Some(request.system_prompt) },
                Message { role: "user".into(), content: Some(request.user_prompt) },
            ],
        });

        debug!(model = %self.model, "sending chat completion request");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(200).collect();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => AssessError::RateLimited(format!("LLM provider: {detail}")),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    AssessError::Internal(format!("LLM provider rejected the API key ({status})"))
                }
                s if s.is_server_error() => AssessError::Network(format!("LLM provider returned {s}: {detail}")),
                s => AssessError::Plugin(format!("LLM provider returned {s}: {detail}")),
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AssessError::InvalidResult("LLM response has no content".to_string()))?;

        Ok(LlmResponse {
            content,
            model: if chat.model.is_empty() { self.model.clone() } else { chat.model },
            total_tokens: chat.usage.map_or(0, |u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// The JSON object inside a model reply: a fenced block when there is one,
/// else the first balanced `{...}`.
pub fn extract_json_from_text(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        // skip the info string (`json`, `JSON`, ...)
        let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let candidate = body[..end].trim();
            if candidate.starts_with('{') {
                return Some(candidate);
            }
        }
    }

    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::plugins::test_server::{Canned, TestServer};

    fn request() -> LlmRequest {
        LlmRequest {
            system_prompt: "You grade repositories.".to_string(),
            user_prompt: "Grade this.".to_string(),
            temperature: 0.1,
            max_tokens: 500,
        }
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(extract_json_from_text(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_bare_object_with_braces_in_strings() {
        let text = r#"Result: {"reason": "uses {placeholders}", "nested": {"x": "\"}"}} trailing"#;
        assert_eq!(
            extract_json_from_text(text),
            Some(r#"{"reason": "uses {placeholders}", "nested": {"x": "\"}"}}"#)
        );
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract_json_from_text("no json here"), None);
        assert_eq!(extract_json_from_text("{ unbalanced"), None);
    }

    #[tokio::test]
    async fn test_chat_completion_round_trip() {
        let server = TestServer::start(vec![(
            "/v1/chat/completions",
            Canned::ok(
                "application/json",
                r#"{"model":"local-model","choices":[{"message":{"role":"assistant","content":"{\"ok\":true}"}}],"usage":{"total_tokens":42}}"#,
            ),
        )])
        .await;
        let provider = OpenAiCompatibleProvider::new(
            &server.url("/v1/"),
            "sk-test",
            "local-model",
            Duration::from_secs(5),
        )
        .unwrap();

        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "{\"ok\":true}");
        assert_eq!(response.total_tokens, 42);

        let body: serde_json::Value = serde_json::from_str(&server.last_body()).unwrap();
        assert_eq!(body["model"], "local-model");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Grade this.");
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let server =
            TestServer::start(vec![("/chat/completions", Canned::status(429, "slow down"))]).await;
        let provider =
            OpenAiCompatibleProvider::new(&server.base_url, "sk", "m", Duration::from_secs(5)).unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }
}
