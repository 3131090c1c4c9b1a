//! Model client configuration.

/// Backend used for generation or embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Local Ollama runtime (`/api/generate`, `/api/embeddings`).
    Ollama,
    /// Any OpenAI-compatible API (`/v1/chat/completions`, `/v1/embeddings`).
    OpenAi,
}

/// Configuration for one model client.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    /// Model identifier (e.g. "qwen2.5-coder:7b-instruct", "text-embedding-3-small").
    pub model: String,
    /// Base endpoint, e.g. "http://127.0.0.1:11434" or "https://api.openai.com".
    pub endpoint: String,
    /// Bearer key for providers that require authentication. Sent in a
    /// header, never embedded in URLs, never logged.
    pub api_key: Option<String>,
    /// Sampling temperature; deterministic-leaning defaults suit citation
    /// validation better than creative ones.
    pub temperature: Option<f32>,
    /// Request timeout in seconds (default 30).
    pub timeout_secs: Option<u64>,
    /// Expected embedding dimension for embedding models.
    pub embedding_dim: usize,
}

impl ModelConfig {
    /// Local Ollama defaults with the given model name.
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: Provider::Ollama,
            model: model.into(),
            endpoint: "http://127.0.0.1:11434".to_string(),
            api_key: None,
            temperature: Some(0.0),
            timeout_secs: Some(30),
            embedding_dim: 768,
        }
    }
}
