//! Text-completion collaborators.

pub mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;

/// A synchronous text-completion service.
///
/// One prompt in, one generated text out, bounded by an output-length
/// budget. Results are ephemeral — nothing here persists.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for `prompt`, capped at `max_tokens` output
    /// tokens.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> anyhow::Result<String>;
}
