//! Concrete model clients with enum dispatch.

pub mod ollama;
pub mod openai;

use async_trait::async_trait;

use crate::config::{ModelConfig, Provider};
use crate::error::Result;
use crate::{Embedding, EmbeddingModel, Generation, LanguageModel};

use ollama::OllamaClient;
use openai::OpenAiClient;

/// Provider-dispatching client implementing both model traits.
pub enum LlmClient {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
}

impl LlmClient {
    pub fn from_config(cfg: ModelConfig) -> Result<Self> {
        match cfg.provider {
            Provider::Ollama => Ok(Self::Ollama(OllamaClient::new(cfg)?)),
            Provider::OpenAi => Ok(Self::OpenAi(OpenAiClient::new(cfg)?)),
        }
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<Generation> {
        match self {
            Self::Ollama(c) => c.generate(prompt, max_tokens).await,
            Self::OpenAi(c) => c.generate(prompt, max_tokens).await,
        }
    }
}

#[async_trait]
impl EmbeddingModel for LlmClient {
    fn dimension(&self) -> usize {
        match self {
            Self::Ollama(c) => c.dimension(),
            Self::OpenAi(c) => c.dimension(),
        }
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        match self {
            Self::Ollama(c) => c.embed(text).await,
            Self::OpenAi(c) => c.embed(text).await,
        }
    }
}

/// Shared endpoint validation for both clients.
pub(crate) fn checked_endpoint(endpoint: &str) -> Result<String> {
    let e = endpoint.trim();
    if e.is_empty() || !(e.starts_with("http://") || e.starts_with("https://")) {
        return Err(crate::error::LlmError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(e.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[test]
    fn endpoint_validation() {
        assert_eq!(
            checked_endpoint("http://127.0.0.1:11434/").unwrap(),
            "http://127.0.0.1:11434"
        );
        assert!(matches!(
            checked_endpoint("127.0.0.1:11434"),
            Err(LlmError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            checked_endpoint("  "),
            Err(LlmError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn client_dispatch_follows_provider() {
        let client = LlmClient::from_config(ModelConfig::ollama("qwen2.5-coder:7b")).unwrap();
        assert!(matches!(client, LlmClient::Ollama(_)));
        assert_eq!(client.dimension(), 768);

        let mut cfg = ModelConfig::ollama("text-embedding-3-small");
        cfg.provider = Provider::OpenAi;
        cfg.endpoint = "https://api.openai.com".to_string();
        cfg.embedding_dim = 1536;
        let client = LlmClient::from_config(cfg).unwrap();
        assert!(matches!(client, LlmClient::OpenAi(_)));
        assert_eq!(client.dimension(), 1536);
    }
}
