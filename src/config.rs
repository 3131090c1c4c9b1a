//! Runtime configuration loaded from environment variables.
//!
//! Every knob has a hard-coded default; `.env` files are honored when
//! present so local runs need no exported variables.

use std::time::Duration;

use answerer::AnswererConfig;
use pr_reviewer::ReviewConfig;
use retriever::RetrieverConfig;
use vector_store::ChunkingPolicy;

/// Config bag for the whole facade.
#[derive(Debug, Clone)]
pub struct WitnessConfig {
    pub retriever: RetrieverConfig,
    pub answerer: AnswererConfig,
    pub review: ReviewConfig,

    /// Snippet budget per evidence passage.
    pub snippet_max_chars: usize,
    pub snippet_ttl: Duration,

    /// Fixed embedding dimension for the deployment.
    pub embedding_dim: usize,
    pub chunking: ChunkingPolicy,

    /// Extra path fragments exempted from analysis and indexing.
    pub skip_paths: Vec<String>,
}

impl Default for WitnessConfig {
    fn default() -> Self {
        Self {
            retriever: RetrieverConfig::default(),
            answerer: AnswererConfig::default(),
            review: ReviewConfig::default(),
            snippet_max_chars: 500,
            snippet_ttl: Duration::from_secs(3600),
            embedding_dim: 768,
            chunking: ChunkingPolicy::default(),
            skip_paths: Vec::new(),
        }
    }
}

impl WitnessConfig {
    /// Builds from `WITNESS_*` environment variables with defaults for
    /// everything unset.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base = Self::default();
        Self {
            retriever: RetrieverConfig {
                trigram_k: parse("WITNESS_TRIGRAM_K", base.retriever.trigram_k),
                vector_k: parse("WITNESS_VECTOR_K", base.retriever.vector_k),
                final_k: parse("WITNESS_FINAL_K", base.retriever.final_k),
                leg_timeout: Duration::from_secs(parse(
                    "WITNESS_RETRIEVER_TIMEOUT_SECS",
                    base.retriever.leg_timeout.as_secs(),
                )),
            },
            answerer: AnswererConfig {
                max_tokens: parse("WITNESS_ANSWER_MAX_TOKENS", base.answerer.max_tokens),
                retry_on_parse_failure: parse(
                    "WITNESS_ANSWER_RETRIES",
                    base.answerer.retry_on_parse_failure,
                ),
            },
            review: ReviewConfig {
                max_critical_explanations: parse(
                    "WITNESS_REVIEW_MAX_EXPLANATIONS",
                    base.review.max_critical_explanations,
                ),
                diff_only: env("WITNESS_DIFF_ONLY", "true") == "true",
            },
            snippet_max_chars: parse("WITNESS_SNIPPET_MAX_CHARS", base.snippet_max_chars),
            snippet_ttl: Duration::from_secs(parse(
                "WITNESS_SNIPPET_TTL_SECS",
                base.snippet_ttl.as_secs(),
            )),
            embedding_dim: parse("WITNESS_EMBEDDING_DIM", base.embedding_dim),
            chunking: base.chunking,
            skip_paths: std::env::var("WITNESS_SKIP_PATHS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
