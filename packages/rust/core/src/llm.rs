//! Generation collaborator client.
//!
//! The pipeline talks to any OpenAI-compatible chat-completion endpoint
//! through the [`ChatClient`] trait; [`OpenAiChatClient`] is the HTTP
//! implementation. Failures (including empty completion content) surface as
//! [`StudyBundleError::Generation`] so every caller's fallback path engages.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use studybundle_shared::{Result, StudyBundleError};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("studybundle/", env!("CARGO_PKG_VERSION"));

/// Generous budget for a single generation round-trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// One role-tagged message of a generation request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// ChatClient trait
// ---------------------------------------------------------------------------

/// Abstraction over the generation collaborator.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Run one generation request, returning the trimmed completion text.
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible HTTP implementation
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiChatClient {
    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                StudyBundleError::config(format!("failed to build HTTP client: {e}"))
            })?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %request.model, messages = request.messages.len(), "sending generation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StudyBundleError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StudyBundleError::Generation(format!(
                "HTTP {status}: {}",
                snippet(&body, 200)
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StudyBundleError::Generation(format!("invalid response body: {e}")))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or("");

        if content.is_empty() {
            return Err(StudyBundleError::Generation(
                "empty completion content".into(),
            ));
        }

        Ok(content.to_string())
    }
}

/// First `max_chars` characters of a body, for error messages.
fn snippet(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".into(),
            messages: vec![
                ChatMessage::system("You are terse."),
                ChatMessage::user("Say hi."),
            ],
            temperature: 0.3,
            max_tokens: None,
        }
    }

    #[test]
    fn request_serialization_omits_absent_max_tokens() {
        let json = serde_json::to_string(&request()).expect("serialize");
        assert!(json.contains(r#""model":"test-model""#));
        assert!(json.contains(r#""role":"system""#));
        assert!(!json.contains("max_tokens"));

        let mut with_cap = request();
        with_cap.max_tokens = Some(1000);
        let json = serde_json::to_string(&with_cap).expect("serialize");
        assert!(json.contains(r#""max_tokens":1000"#));
    }

    #[tokio::test]
    async fn complete_returns_trimmed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  hello there \n"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "test-key").expect("client");
        let answer = client.complete(request()).await.expect("completion");
        assert_eq!(answer, "hello there");
    }

    #[tokio::test]
    async fn empty_content_is_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": ""}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "test-key").expect("client");
        let result = client.complete(request()).await;
        assert!(matches!(result, Err(StudyBundleError::Generation(_))));
    }

    #[tokio::test]
    async fn error_status_is_a_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(server.uri(), "test-key").expect("client");
        let err = client.complete(request()).await.expect_err("must fail");
        assert!(err.to_string().contains("429"));
    }
}
