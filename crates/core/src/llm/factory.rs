// crates/core/src/llm/factory.rs
//! Provider factory: creates an LlmProvider from configuration.

use std::sync::Arc;

use super::config::{LlmConfig, ProviderType};
use super::openai::OpenAiProvider;
use super::provider::LlmProvider;
use super::types::LlmError;

/// Create an LLM provider based on the given configuration.
///
/// Fails with `NotAvailable` when required credentials are missing.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    config.validate()?;
    let provider = match config.provider {
        ProviderType::AzureOpenAi => OpenAiProvider::azure(config)?,
        ProviderType::OpenAi => OpenAiProvider::openai(config)?,
    };
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "LLM provider created"
    );
    Ok(Arc::new(provider))
}
