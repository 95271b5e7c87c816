//! OpenAI chat completions provider.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http;
use handbook_core::{AppError, AppResult, ProviderKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client: http::build_client(timeout)?,
        })
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending chat completion request to OpenAI");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| http::transport_error(ProviderKind::Completion, "openai", self.timeout, e))?;

        if !response.status().is_success() {
            return Err(http::error_from_response(ProviderKind::Completion, "openai", response).await);
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            AppError::permanent(
                ProviderKind::Completion,
                format!("Failed to parse OpenAI response: {}", e),
            )
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::transient(ProviderKind::Completion, "OpenAI returned no choices")
            })?;

        let usage = body
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        tracing::debug!(
            total_tokens = usage.total_tokens,
            "Received completion from OpenAI"
        );

        Ok(LlmResponse {
            content,
            model: body.model,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 12, "total_tokens": 112}
        })
    }

    #[tokio::test]
    async fn test_complete_sends_messages_and_temperature() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o",
                "temperature": 0.5,
                "messages": [{"role": "user", "content": "Question?"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("Answer.")))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
        let response = client
            .complete(&LlmRequest::new("Question?", "gpt-4o").with_temperature(0.5))
            .await
            .unwrap();

        assert_eq!(response.content, "Answer.");
        assert_eq!(response.usage.total_tokens, 112);
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(server.uri(), "sk-test", Duration::from_secs(5)).unwrap();
        let err = client
            .complete(&LlmRequest::new("q", "gpt-4o"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Provider {
                kind: ProviderKind::Completion,
                retryable: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout_not_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_body("late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            OpenAiClient::new(server.uri(), "sk-test", Duration::from_millis(200)).unwrap();
        let err = client
            .complete(&LlmRequest::new("q", "gpt-4o"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[test]
    fn test_system_message_comes_first() {
        let client = OpenAiClient::new(DEFAULT_OPENAI_URL, "k", Duration::from_secs(1)).unwrap();
        let request = LlmRequest::new("user text", "gpt-4o").with_system("rules");
        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "user text");
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = OpenAiClient::new(DEFAULT_OPENAI_URL, "sk-secret", Duration::from_secs(1))
            .unwrap();
        assert!(!format!("{:?}", client).contains("sk-secret"));
    }
}
