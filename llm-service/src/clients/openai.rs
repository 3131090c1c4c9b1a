//! Client for OpenAI-compatible APIs.
//!
//! - `POST {endpoint}/v1/chat/completions` — non-streaming chat completion
//! - `POST {endpoint}/v1/embeddings`       — single-input embeddings

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::checked_endpoint;
use crate::config::ModelConfig;
use crate::error::{LlmError, Result, body_snippet};
use crate::{Embedding, Generation, approx_token_count};

pub struct OpenAiClient {
    client: reqwest::Client,
    cfg: ModelConfig,
    url_chat: String,
    url_embeddings: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingsItem {
    embedding: Vec<f32>,
}

impl OpenAiClient {
    pub fn new(cfg: ModelConfig) -> Result<Self> {
        let base = checked_endpoint(&cfg.endpoint)?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &cfg.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|_| LlmError::InvalidEndpoint("api key not header-safe".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(30));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            url_chat: format!("{base}/v1/chat/completions"),
            url_embeddings: format!("{base}/v1/embeddings"),
            client,
            cfg,
        })
    }

    pub fn dimension(&self) -> usize {
        self.cfg.embedding_dim
    }

    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<Generation> {
        debug!(model = %self.cfg.model, prompt_len = prompt.len(), "POST {}", self.url_chat);
        let req = ChatRequest {
            model: &self.cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.cfg.temperature,
        };

        let resp = self.client.post(&self.url_chat).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_chat.clone(),
                snippet: body_snippet(&text),
            });
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("expected `choices[0].message.content`: {e}")))?;

        let text = body
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or(LlmError::Empty)?;

        let (input_tokens, output_tokens) = match body.usage {
            Some(u) => (u.prompt_tokens, u.completion_tokens),
            None => (approx_token_count(prompt), approx_token_count(&text)),
        };

        Ok(Generation {
            text,
            input_tokens,
            output_tokens,
        })
    }

    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(model = %self.cfg.model, text_len = text.len(), "POST {}", self.url_embeddings);
        let req = EmbeddingsRequest {
            model: &self.cfg.model,
            input: text,
        };

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_embeddings.clone(),
                snippet: body_snippet(&body),
            });
        }

        let body: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("expected `data[0].embedding`: {e}")))?;

        let vector = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::Empty)?;
        if vector.is_empty() {
            return Err(LlmError::Empty);
        }

        let token_count = body
            .usage
            .map(|u| u.prompt_tokens)
            .unwrap_or_else(|| approx_token_count(text));

        Ok(Embedding {
            vector,
            token_count,
        })
    }
}
