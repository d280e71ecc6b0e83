// crates/core/src/llm/openai.rs
//! OpenAI-compatible chat completions provider (OpenAI or Azure OpenAI).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::config::LlmConfig;
use super::provider::LlmProvider;
use super::types::{CompletionRequest, CompletionResponse, LlmError};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

enum Auth {
    Bearer(String),
    ApiKey(String),
}

/// LLM provider speaking the chat completions wire format.
pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    auth: Auth,
    name: &'static str,
    /// Model name for OpenAI, deployment name for Azure.
    model: String,
    send_model: bool,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl OpenAiProvider {
    /// Plain OpenAI. `endpoint`, when set, replaces the public base URL.
    pub fn openai(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = required(&config.api_key, "OpenAI api key")?;
        let base = config
            .endpoint
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/');
        Self::build(
            config,
            format!("{base}/v1/chat/completions"),
            Auth::Bearer(key),
            "openai",
            config.model.clone(),
            true,
        )
    }

    /// Azure OpenAI deployment.
    pub fn azure(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = required(&config.api_key, "Azure OpenAI api key")?;
        let endpoint = required(&config.endpoint, "Azure OpenAI endpoint")?;
        let deployment = required(&config.deployment, "Azure OpenAI deployment")?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            config.api_version
        );
        Self::build(config, url, Auth::ApiKey(key), "azure-openai", deployment, false)
    }

    fn build(
        config: &LlmConfig,
        url: String,
        auth: Auth,
        name: &'static str,
        model: String,
        send_model: bool,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url,
            auth,
            name,
            model,
            send_model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

/// At most `max` chars of `s`, cut on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn required(value: &Option<String>, what: &str) -> Result<String, LlmError> {
    value
        .clone()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LlmError::NotAvailable(format!("{what} is not configured")))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });
        let body = ChatRequest {
            model: self.send_model.then_some(self.model.as_str()),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(provider = self.name, model = %self.model, "chat completion: sending");
        let req = self.client.post(&self.url).json(&body);
        let req = match &self.auth {
            Auth::Bearer(key) => req.bearer_auth(key),
            Auth::ApiKey(key) => req.header("api-key", key),
        };

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!(elapsed_ms = start.elapsed().as_millis() as u64, "chat completion: timed out");
                LlmError::Timeout(self.timeout_secs)
            } else {
                LlmError::Request(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            return Err(LlmError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %truncate_chars(&text, 500), "chat completion: error status");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::ParseFailed(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ParseFailed("response has no message content".into()))?;

        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(provider = self.name, latency_ms, "chat completion: received");

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            input_tokens: parsed.usage.as_ref().and_then(|u| u.prompt_tokens),
            output_tokens: parsed.usage.as_ref().and_then(|u| u.completion_tokens),
            latency_ms,
        })
    }

    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::config::ProviderType;
    use mockito::Matcher;

    const OK_BODY: &str = r#"{
        "model": "gpt-4o-mini-2024",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Database pool exhausted"}}],
        "usage": {"prompt_tokens": 42, "completion_tokens": 5, "total_tokens": 47}
    }"#;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: Some("You write ticket titles.".into()),
            user_prompt: "Error Log:\nERROR pool exhausted".into(),
        }
    }

    fn openai_config(url: String) -> LlmConfig {
        LlmConfig {
            provider: ProviderType::OpenAi,
            api_key: Some("sk-test".into()),
            endpoint: Some(url),
            model: "gpt-4o-mini".into(),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn openai_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJsonString(
                r#"{"model": "gpt-4o-mini", "max_tokens": 500}"#.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let provider = OpenAiProvider::openai(&openai_config(server.url())).unwrap();
        let resp = provider.complete(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.content, "Database pool exhausted");
        assert_eq!(resp.model.as_deref(), Some("gpt-4o-mini-2024"));
        assert_eq!(resp.total_tokens(), 47);
    }

    #[tokio::test]
    async fn azure_completion_uses_deployment_url_and_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                Matcher::Regex(r"^/openai/deployments/tickets/chat/completions".into()),
            )
            .match_header("api-key", "azure-key")
            .with_status(200)
            .with_body(OK_BODY)
            .create_async()
            .await;

        let config = LlmConfig {
            api_key: Some("azure-key".into()),
            endpoint: Some(format!("{}/", server.url())),
            deployment: Some("tickets".into()),
            ..LlmConfig::default()
        };
        let provider = OpenAiProvider::azure(&config).unwrap();
        let resp = provider.complete(request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.content, "Database pool exhausted");
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let provider = OpenAiProvider::openai(&openai_config(server.url())).unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { retry_after_secs: 7 }));
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let provider = OpenAiProvider::openai(&openai_config(server.url())).unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn non_ascii_error_body_is_logged_without_panicking() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let body = format!("{}€ tail", "x".repeat(499));
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body(&body)
            .create_async()
            .await;

        let provider = OpenAiProvider::openai(&openai_config(server.url())).unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, body);
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        let text = format!("{}€€", "x".repeat(499));
        assert_eq!(truncate_chars(&text, 500), format!("{}€", "x".repeat(499)));
        assert_eq!(truncate_chars("short", 500), "short");
        assert_eq!(truncate_chars("ééé", 2), "éé");
    }

    #[tokio::test]
    async fn empty_choices_is_parse_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = OpenAiProvider::openai(&openai_config(server.url())).unwrap();
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::ParseFailed(_)));
    }
}
