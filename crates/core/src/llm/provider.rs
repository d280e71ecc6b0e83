// crates/core/src/llm/provider.rs
//! LlmProvider trait defining the interface for LLM integrations.

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM providers that can run a chat completion.
///
/// Implementations:
/// - `OpenAiProvider`: OpenAI chat completions API, or an Azure OpenAI deployment
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run a completion with an optional system prompt and a user prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Provider name for logging (e.g. "azure-openai", "openai").
    fn name(&self) -> &str;

    /// Model or deployment identifier.
    fn model(&self) -> &str;
}
