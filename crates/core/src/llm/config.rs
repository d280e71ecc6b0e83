// crates/core/src/llm/config.rs
//! LLM provider configuration types.

use serde::{Deserialize, Serialize};

use super::types::LlmError;
use crate::config::parse_var;
use crate::error::ConfigError;

/// Configuration for an LLM provider instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderType,
    pub model: String,
    pub api_key: Option<String>,
    /// Azure resource endpoint, or a base URL override for OpenAI.
    pub endpoint: Option<String>,
    /// Azure deployment name.
    pub deployment: Option<String>,
    pub api_version: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Supported LLM provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "AzureOpenAI")]
    AzureOpenAi,
    #[serde(rename = "OpenAI")]
    OpenAi,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AzureOpenAi => "AzureOpenAI",
            Self::OpenAi => "OpenAI",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AzureOpenAI" => Some(Self::AzureOpenAi),
            "OpenAI" => Some(Self::OpenAi),
            _ => None,
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            Self::AzureOpenAi => "AZURE_OPENAI_",
            Self::OpenAi => "OPENAI_",
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::AzureOpenAi,
            model: "gpt-4".into(),
            api_key: None,
            endpoint: None,
            deployment: None,
            api_version: "2024-02-15-preview".into(),
            temperature: 0.1,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    /// Override fields from provider-prefixed variables
    /// (`AZURE_OPENAI_*` or `OPENAI_*`) plus `LLM_TIMEOUT_SECS`.
    pub fn apply_overrides(
        &mut self,
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let prefix = self.provider.env_prefix();
        let var = |name: &str| {
            let key = format!("{prefix}{name}");
            lookup(&key).map(|v| (key, v))
        };

        if let Some((_, v)) = var("API_KEY") {
            self.api_key = Some(v);
        }
        if let Some((_, v)) = var("MODEL") {
            self.model = v;
        }
        if let Some((key, v)) = var("TEMPERATURE") {
            self.temperature = parse_var(&key, &v)?;
        }
        if let Some((key, v)) = var("MAX_TOKENS") {
            self.max_tokens = parse_var(&key, &v)?;
        }
        if self.provider == ProviderType::AzureOpenAi {
            if let Some((_, v)) = var("ENDPOINT") {
                self.endpoint = Some(v);
            }
            if let Some((_, v)) = var("DEPLOYMENT_NAME") {
                self.deployment = Some(v);
            }
            if let Some((_, v)) = var("API_VERSION") {
                self.api_version = v;
            }
        }
        if let Some(v) = lookup("LLM_TIMEOUT_SECS") {
            self.timeout_secs = parse_var("LLM_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    /// Azure needs endpoint, key and deployment; OpenAI needs a key.
    pub fn validate(&self) -> Result<(), LlmError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        let ok = match self.provider {
            ProviderType::AzureOpenAi => {
                present(&self.endpoint) && present(&self.api_key) && present(&self.deployment)
            }
            ProviderType::OpenAi => present(&self.api_key),
        };
        if ok {
            Ok(())
        } else {
            Err(LlmError::NotAvailable(format!(
                "Invalid {} configuration, check its environment variables",
                self.provider.as_str()
            )))
        }
    }
}
