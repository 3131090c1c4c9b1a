//! Model interfaces for constrained generation and embeddings.
//!
//! The rest of the workspace talks to language models exclusively through
//! [`LanguageModel`] and [`EmbeddingModel`]. Two thin HTTP clients are
//! provided: local Ollama and any OpenAI-compatible endpoint. Both report
//! token counts so callers can meter usage accurately.

pub mod clients;
pub mod config;
pub mod error;

pub use clients::LlmClient;
pub use config::{ModelConfig, Provider};
pub use error::{LlmError, Result};

use async_trait::async_trait;

/// One completed generation with provider-reported token counts.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One embedding vector plus the token count charged for it.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub token_count: u64,
}

/// Text generation boundary. Implementations are interchangeable; the
/// callers never depend on provider specifics.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<Generation>;
}

/// Embedding boundary. `dimension` is fixed per deployment; stores reject
/// vectors of any other length.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Rough token estimate (~4 chars per token) for providers that do not
/// report counts on every call.
pub fn approx_token_count(text: &str) -> u64 {
    (text.len() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_token_count_rounds_up() {
        assert_eq!(approx_token_count(""), 0);
        assert_eq!(approx_token_count("abc"), 1);
        assert_eq!(approx_token_count("abcd"), 1);
        assert_eq!(approx_token_count("abcde"), 2);
    }
}
