// crates/core/src/llm/types.rs
//! Request/response/error types for LLM integration.

use thiserror::Error;

/// Request for a chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub latency_ms: u64,
}

impl CompletionResponse {
    /// Prompt plus completion tokens, when the provider reported them.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.unwrap_or(0) + self.output_tokens.unwrap_or(0)
    }
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseFailed(String),

    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_tokens() {
        let resp = CompletionResponse {
            content: "hello".to_string(),
            model: Some("gpt-4".to_string()),
            input_tokens: Some(10),
            output_tokens: Some(321),
            latency_ms: 100,
        };
        assert_eq!(resp.total_tokens(), 331);

        let resp = CompletionResponse {
            input_tokens: None,
            ..resp
        };
        assert_eq!(resp.total_tokens(), 321);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "Timeout after 30 seconds");

        let err = LlmError::Api {
            status: 401,
            message: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "API returned 401: bad key");

        let err = LlmError::RateLimited { retry_after_secs: 60 };
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
