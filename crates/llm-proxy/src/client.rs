use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::types::{ChatRequest, ChatResponse};
use crate::{LlmProxyError, Result};

/// Default routed endpoint of the AI Pipe OpenRouter proxy.
pub const DEFAULT_BASE_URL: &str = "https://aipipe.org/openrouter/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Bytes of an error body kept in [`LlmProxyError::Status`].
const ERROR_BODY_LIMIT: usize = 500;

// ─── ChatBackend ──────────────────────────────────────────────────────────

/// Anything that can turn a chat request into the assistant's reply text.
///
/// [`ProxyClient`] is the production implementation; tests substitute
/// scripted backends so retry and fallback paths run without a network.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

// ─── ProxyConfig ──────────────────────────────────────────────────────────

/// Connection settings for the proxy. Built once by the binary and handed in.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub model: String,
    /// Per-request timeout. Exceeding it is reported as an HTTP error.
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

// ─── ProxyClient ──────────────────────────────────────────────────────────

pub struct ProxyClient {
    config: ProxyConfig,
    http: reqwest::Client,
}

impl ProxyClient {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatBackend for ProxyClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let token = self
            .config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(LlmProxyError::MissingToken)?;

        let mut body = request.clone();
        if body.model.is_empty() {
            body.model = self.config.model.clone();
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "LLM proxy request failed");
            return Err(LlmProxyError::Status {
                status: status.as_u16(),
                body: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|source| LlmProxyError::Parse {
                body: truncate(&text, ERROR_BODY_LIMIT),
                source,
            })?;

        if let Some(usage) = parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "LLM proxy usage"
            );
        }

        Ok(parsed.content().to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn client_for(url: &str, token: Option<&str>) -> ProxyClient {
        ProxyClient::new(ProxyConfig {
            base_url: url.to_string(),
            token: token.map(str::to_string),
            model: "test-model".into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system("contract"),
            ChatMessage::user("apply round 1"),
        ])
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer tok-1")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model":"test-model"}"#.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"a.html\":\"x\"}"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server.url(), Some("tok-1"));
        let text = client.complete(&request()).await.unwrap();
        assert_eq!(text, r#"{"a.html":"x"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_surfaces_non_2xx_as_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = client_for(&server.url(), Some("tok"));
        let err = client.complete(&request()).await.unwrap_err();
        match err {
            LlmProxyError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_without_token_fails_before_sending() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmProxyError::MissingToken));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_rejects_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = client_for(&server.url(), Some("tok"));
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, LlmProxyError::Parse { .. }));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = client_for("http://proxy.local/v1/", Some("t"));
        assert_eq!(client.endpoint(), "http://proxy.local/v1/chat/completions");
    }
}
