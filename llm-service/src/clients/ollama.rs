//! Thin client for the local Ollama API.
//!
//! - `POST {endpoint}/api/generate`   — synchronous generation (`stream=false`)
//! - `POST {endpoint}/api/embeddings` — embeddings retrieval

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clients::checked_endpoint;
use crate::config::ModelConfig;
use crate::error::{LlmError, Result, body_snippet};
use crate::{Embedding, Generation, approx_token_count};

pub struct OllamaClient {
    client: reqwest::Client,
    cfg: ModelConfig,
    url_generate: String,
    url_embeddings: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    pub fn new(cfg: ModelConfig) -> Result<Self> {
        let base = checked_endpoint(&cfg.endpoint)?;
        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(30));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url_generate: format!("{base}/api/generate"),
            url_embeddings: format!("{base}/api/embeddings"),
            client,
            cfg,
        })
    }

    pub fn dimension(&self) -> usize {
        self.cfg.embedding_dim
    }

    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<Generation> {
        debug!(model = %self.cfg.model, prompt_len = prompt.len(), "POST {}", self.url_generate);
        let req = GenerateRequest {
            model: &self.cfg.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
                temperature: self.cfg.temperature,
            },
        };

        let resp = self.client.post(&self.url_generate).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_generate.clone(),
                snippet: body_snippet(&text),
            });
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("expected `response` field: {e}")))?;

        let input_tokens = body
            .prompt_eval_count
            .unwrap_or_else(|| approx_token_count(prompt));
        let output_tokens = body
            .eval_count
            .unwrap_or_else(|| approx_token_count(&body.response));

        Ok(Generation {
            text: body.response,
            input_tokens,
            output_tokens,
        })
    }

    pub async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!(model = %self.cfg.model, text_len = text.len(), "POST {}", self.url_embeddings);
        let req = EmbeddingsRequest {
            model: &self.cfg.model,
            prompt: text,
        };

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url_embeddings.clone(),
                snippet: body_snippet(&text),
            });
        }

        let body: EmbeddingsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("expected `embedding` field: {e}")))?;

        if body.embedding.is_empty() {
            return Err(LlmError::Empty);
        }

        Ok(Embedding {
            token_count: approx_token_count(text),
            vector: body.embedding,
        })
    }
}
