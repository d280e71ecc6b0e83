// crates/core/src/llm/mod.rs
//! LLM integration for ticket content generation.
//!
//! Provides the `LlmProvider` trait, an OpenAI-compatible HTTP provider
//! (plain OpenAI or an Azure deployment) and the factory that picks one
//! from configuration.

pub mod config;
pub mod factory;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::{LlmConfig, ProviderType};
pub use factory::create_provider;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use types::{CompletionRequest, CompletionResponse, LlmError};
