//! Completion providers for claim extraction and stance analysis.
//!
//! Everything above this module talks to a [`CompletionProvider`]; the
//! concrete provider is chosen once, from configuration, by
//! [`build_completion_provider`].

mod client;
mod types;


pub use client::{GeminiClient, OpenAiClient};
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{LlmConfig, LlmProvider, RequestConfig};
use crate::error::LlmResult;

/// A text completion capability.
///
/// Implementations return the raw completion text; callers own all parsing
/// and validation of the output.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt`, optionally steered by `system_prompt`.
    async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> LlmResult<String>;

    /// Short provider identifier for logs.
    fn provider_name(&self) -> &'static str;
}

/// Shared completion provider handle
pub type SharedCompletionProvider = Arc<dyn CompletionProvider>;

/// Build the configured completion provider
pub fn build_completion_provider(
    config: &LlmConfig,
    request_config: RequestConfig,
) -> LlmResult<SharedCompletionProvider> {
    let provider: SharedCompletionProvider = match config.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(config, request_config)?),
        LlmProvider::Gemini => Arc::new(GeminiClient::new(config, request_config)?),
    };
    tracing::info!(provider = provider.provider_name(), "Completion provider initialized");
    Ok(provider)
}
