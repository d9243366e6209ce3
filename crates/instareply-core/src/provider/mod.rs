pub mod openai_compat;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{CompletionResponse, Message};

pub use openai_compat::OpenAiCompatProvider;

/// Trait for LLM completion providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<CompletionResponse, ProviderError>;
}

/// Build the completion provider from a credential and optional base URL.
pub fn create_provider(api_key: &str, api_base: Option<&str>) -> Box<dyn LlmProvider> {
    Box::new(OpenAiCompatProvider::new(
        api_key.to_string(),
        api_base.map(|s| s.to_string()),
    ))
}
