//! Ticket title and description generation.
//!
//! Two variants behind one type: the deterministic heuristic, and a
//! model-backed generator that asks an LLM. The model path fails closed:
//! any error or unusable output is returned as `TicketError`, and
//! [`TicketGenerator::generate_or_fallback`] then uses the heuristic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::llm::{CompletionRequest, LlmError, LlmProvider};
use crate::record::ErrorRecord;
use crate::title::{extract_title, MAX_TITLE_CHARS};

const TITLE_PROMPT: &str = "You analyse application error logs and write ticket titles.

Write one clear, specific title for the error below:
- name the failing component or operation and what went wrong
- keep it under 100 characters
- use normal sentence capitalisation
- never answer with something generic such as \"Error in logs\" or \"System failure\"

Good: \"Database connection timeout in user authentication service\"
Good: \"SSL certificate validation failure for external API calls\"

Reply with the title only.";

const DESCRIPTION_PROMPT: &str = "You analyse application error logs and write ticket descriptions for developers.

Describe, in one or a few plain paragraphs:
- what happened
- the likely cause
- the impact on the system or its users
- any detail from the log that helps diagnose it

Be specific and technical. Do not use headings, bullet points or suggested actions.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketContent {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum TicketError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Model returned an empty title")]
    EmptyTitle,

    #[error("Model title is {0} characters, over the limit")]
    TitleTooLong(usize),

    #[error("Model returned an empty description")]
    EmptyDescription,
}

/// Ticket content plus whether the heuristic had to stand in for the model.
#[derive(Debug, Clone)]
pub struct GeneratedTicket {
    pub content: TicketContent,
    pub fell_back: bool,
}

/// Deterministic content: stripped first line as title, block as description.
pub fn heuristic_content(record: &ErrorRecord) -> TicketContent {
    TicketContent {
        title: extract_title(&record.error_line),
        description: record.error_context.clone(),
    }
}

pub enum TicketGenerator {
    Heuristic,
    ModelBacked(ModelTicketGenerator),
}

impl TicketGenerator {
    pub fn name(&self) -> &str {
        match self {
            Self::Heuristic => "heuristic",
            Self::ModelBacked(m) => m.provider.name(),
        }
    }

    pub async fn generate(&self, record: &ErrorRecord) -> Result<TicketContent, TicketError> {
        match self {
            Self::Heuristic => Ok(heuristic_content(record)),
            Self::ModelBacked(m) => m.generate(record).await,
        }
    }

    /// Generate content, substituting the heuristic on any model failure.
    pub async fn generate_or_fallback(&self, record: &ErrorRecord) -> GeneratedTicket {
        match self.generate(record).await {
            Ok(content) => GeneratedTicket {
                content,
                fell_back: false,
            },
            Err(e) => {
                warn!(generator = self.name(), error = %e, "Ticket generation failed, using heuristic title");
                GeneratedTicket {
                    content: heuristic_content(record),
                    fell_back: true,
                }
            }
        }
    }
}

pub struct ModelTicketGenerator {
    provider: Arc<dyn LlmProvider>,
    tokens_used: AtomicU64,
}

impl ModelTicketGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            tokens_used: AtomicU64::new(0),
        }
    }

    pub async fn generate(&self, record: &ErrorRecord) -> Result<TicketContent, TicketError> {
        let title = self.generate_title(record).await?;
        let description = self.generate_description(record).await?;
        Ok(TicketContent { title, description })
    }

    async fn generate_title(&self, record: &ErrorRecord) -> Result<String, TicketError> {
        let user_prompt = format!(
            "Log Level: {}\n\nError Log:\n{}",
            record.level, record.error_context
        );
        let title = self.complete(TITLE_PROMPT, user_prompt).await?;
        let title = title.trim().trim_matches('"').trim().to_string();

        let chars = title.chars().count();
        if chars == 0 {
            return Err(TicketError::EmptyTitle);
        }
        if chars > MAX_TITLE_CHARS {
            return Err(TicketError::TitleTooLong(chars));
        }
        Ok(title)
    }

    async fn generate_description(&self, record: &ErrorRecord) -> Result<String, TicketError> {
        let user_prompt = format!(
            "Timestamp: {}\nSource: {}\nLog Level: {}\n\nError Log:\n{}",
            record.timestamp, record.source, record.level, record.error_context
        );
        let description = self.complete(DESCRIPTION_PROMPT, user_prompt).await?;
        let description = description.trim();
        if description.is_empty() {
            return Err(TicketError::EmptyDescription);
        }
        Ok(description.to_string())
    }

    async fn complete(&self, system: &str, user_prompt: String) -> Result<String, LlmError> {
        let resp = self
            .provider
            .complete(CompletionRequest {
                system_prompt: Some(system.to_string()),
                user_prompt,
            })
            .await?;
        self.tokens_used
            .fetch_add(resp.total_tokens(), Ordering::Relaxed);
        Ok(resp.content)
    }

    /// Tokens reported by the provider since creation or the last reset.
    pub fn token_usage(&self) -> u64 {
        self.tokens_used.load(Ordering::Relaxed)
    }

    pub fn reset_token_usage(&self) {
        self.tokens_used.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::llm::CompletionResponse;
    use crate::title::FALLBACK_TITLE;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays canned replies in order and records the prompts it saw.
    struct ScriptedProvider {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.prompts.lock().unwrap().push(request.user_prompt);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(LlmError::NotAvailable("script exhausted".into())))?;
            Ok(CompletionResponse {
                content: reply,
                model: None,
                input_tokens: Some(10),
                output_tokens: Some(5),
                latency_ms: 1,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }
    }

    fn record() -> ErrorRecord {
        ErrorRecord {
            timestamp: "2024-01-01T10:00:00".into(),
            level: Level::Error,
            error_line: "2024-01-01 10:00:00 ERROR pool: connection pool exhausted".into(),
            error_context: "2024-01-01 10:00:00 ERROR pool: connection pool exhausted\n  at db.get".into(),
            source: "/var/log/api.log".into(),
        }
    }

    #[tokio::test]
    async fn heuristic_uses_stripped_title_and_full_context() {
        let out = TicketGenerator::Heuristic.generate_or_fallback(&record()).await;
        assert!(!out.fell_back);
        assert_eq!(out.content.title, "connection pool exhausted");
        assert_eq!(out.content.description, record().error_context);
    }

    #[tokio::test]
    async fn model_output_is_used_and_tokens_counted() {
        let provider = ScriptedProvider::new(vec![
            Ok("  \"Connection pool exhausted in API database layer\"\n".into()),
            Ok("The API ran out of pooled connections.".into()),
        ]);
        let generator = TicketGenerator::ModelBacked(ModelTicketGenerator::new(provider.clone()));

        let out = generator.generate_or_fallback(&record()).await;
        assert!(!out.fell_back);
        assert_eq!(out.content.title, "Connection pool exhausted in API database layer");
        assert_eq!(out.content.description, "The API ran out of pooled connections.");

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("Log Level: ERROR"));
        assert!(prompts[1].contains("Source: /var/log/api.log"));

        let TicketGenerator::ModelBacked(m) = &generator else {
            unreachable!()
        };
        assert_eq!(m.token_usage(), 30);
        m.reset_token_usage();
        assert_eq!(m.token_usage(), 0);
    }

    #[tokio::test]
    async fn provider_error_falls_back_to_heuristic() {
        let provider = ScriptedProvider::new(vec![Err(LlmError::Timeout(30))]);
        let generator = TicketGenerator::ModelBacked(ModelTicketGenerator::new(provider));

        let out = generator.generate_or_fallback(&record()).await;
        assert!(out.fell_back);
        assert_eq!(out.content, heuristic_content(&record()));
    }

    #[tokio::test]
    async fn oversized_or_empty_output_falls_back() {
        let long = "t".repeat(MAX_TITLE_CHARS + 1);
        let provider = ScriptedProvider::new(vec![Ok(long)]);
        let generator = ModelTicketGenerator::new(provider);
        assert!(matches!(
            generator.generate(&record()).await,
            Err(TicketError::TitleTooLong(201))
        ));

        let provider = ScriptedProvider::new(vec![Ok("Pool exhausted in API".into()), Ok("   ".into())]);
        let generator = TicketGenerator::ModelBacked(ModelTicketGenerator::new(provider));
        let out = generator.generate_or_fallback(&record()).await;
        assert!(out.fell_back);
        assert_ne!(out.content.title, FALLBACK_TITLE);
        assert_eq!(out.content.description, record().error_context);
    }
}
