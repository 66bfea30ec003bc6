//! Completion API boundary

pub mod openai;
pub mod prompt;

use async_trait::async_trait;

pub use openai::OpenAiClient;

/// One structured-output completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to constrain output to a JSON object
    pub json_response: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("insufficient quota")]
    QuotaExceeded,
    #[error("invalid API key")]
    InvalidCredentials,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Empty response from AI provider")]
    EmptyResponse,
    #[error("unreadable provider response: {0}")]
    InvalidResponse(String),
}

/// Hosted LLM completion capability.
///
/// Returns the raw text of the first choice; callers validate its structure.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
