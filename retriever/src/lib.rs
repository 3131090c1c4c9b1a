//! Hybrid retriever: trigram and vector legs fanned out concurrently,
//! merged by `(file, start_line)`, ranked with stable tie-breaks, then
//! hydrated with literal snippets.

pub mod keywords;
pub mod types;

pub use keywords::extract_keywords;
pub use types::{Retrieval, SourceOrigin, SourceUnit};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use index_store::{IndexStore, RepoId};
use llm_service::EmbeddingModel;
use services::{CancelToken, Cancelled, bounded};
use source_access::{SnippetFetcher, fetch_placeholder};
use thiserror::Error;
use tracing::debug;
use vector_store::VectorStore;

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    Timeout(#[from] services::Elapsed),

    #[error("index store error: {0}")]
    Index(#[from] index_store::IndexError),

    #[error("vector store error: {0}")]
    Vector(#[from] vector_store::VectorError),

    #[error("query embedding failed: {0}")]
    Embed(#[from] llm_service::LlmError),
}

pub type Result<T> = std::result::Result<T, RetrieveError>;

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Trigram leg candidate count.
    pub trigram_k: usize,
    /// Vector leg candidate count.
    pub vector_k: usize,
    /// Numbered sources returned after the merge.
    pub final_k: usize,
    /// Budget per store leg.
    pub leg_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            trigram_k: 10,
            vector_k: 15,
            final_k: 15,
            leg_timeout: Duration::from_secs(3),
        }
    }
}

/// Merged candidate before numbering and hydration.
#[derive(Debug, Clone)]
struct Candidate {
    file: String,
    start_line: u32,
    end_line: u32,
    symbol_name: Option<String>,
    score: f32,
    origin: SourceOrigin,
}

pub struct Retriever {
    index: Arc<dyn IndexStore>,
    vectors: Arc<dyn VectorStore>,
    snippets: Arc<SnippetFetcher>,
    embedder: Arc<dyn EmbeddingModel>,
    cfg: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<dyn IndexStore>,
        vectors: Arc<dyn VectorStore>,
        snippets: Arc<SnippetFetcher>,
        embedder: Arc<dyn EmbeddingModel>,
        cfg: RetrieverConfig,
    ) -> Self {
        Self {
            index,
            vectors,
            snippets,
            embedder,
            cfg,
        }
    }

    /// Runs both search legs for `query`, returning numbered sources.
    /// Deterministic for a fixed `(repo, commit, query)`: equal scores
    /// order by file, then start line.
    pub async fn retrieve(
        &self,
        repo: &RepoId,
        commit: &str,
        query: &str,
        cancel: &CancelToken,
    ) -> Result<Retrieval> {
        cancel.check()?;

        let keywords = extract_keywords(query);
        debug!(repo = %repo, query, ?keywords, "retrieval start");

        let embedding = tokio::select! {
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            out = self.embedder.embed(query) => out?,
        };

        // Both store legs run concurrently; cancellation drops the whole
        // fan-out at the select boundary.
        let trigram_query = keywords.join(" ");
        let fanout = async {
            tokio::join!(
                bounded(
                    "retriever.trigram",
                    self.cfg.leg_timeout,
                    self.index
                        .trigram_search(repo, &trigram_query, self.cfg.trigram_k),
                ),
                bounded(
                    "retriever.vector",
                    self.cfg.leg_timeout,
                    self.vectors.search(repo, &embedding.vector, self.cfg.vector_k),
                ),
            )
        };
        let (trigram_leg, vector_leg) = tokio::select! {
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            out = fanout => out,
        };
        let trigram_hits = trigram_leg??;
        let vector_hits = vector_leg??;

        // Merge by (file, start_line); a candidate present in both legs
        // keeps the max normalized score.
        let mut merged: HashMap<(String, u32), Candidate> = HashMap::new();
        for hit in trigram_hits {
            let key = (hit.symbol.file.clone(), hit.symbol.start_line);
            merged.insert(
                key,
                Candidate {
                    file: hit.symbol.file.clone(),
                    start_line: hit.symbol.start_line,
                    end_line: hit.symbol.end_line,
                    symbol_name: Some(hit.symbol.qualified_name.clone()),
                    score: hit.score.clamp(0.0, 1.0),
                    origin: SourceOrigin::Trigram,
                },
            );
        }
        for hit in vector_hits {
            // Cosine lands in -1..=1; normalize before comparing legs.
            let score = ((hit.score + 1.0) / 2.0).clamp(0.0, 1.0);
            let key = (hit.key.file.clone(), hit.key.start_line);
            merged
                .entry(key)
                .and_modify(|c| {
                    c.score = c.score.max(score);
                    c.origin = SourceOrigin::Both;
                    if c.symbol_name.is_none() {
                        c.symbol_name = Some(hit.qualified_name.clone());
                    }
                })
                .or_insert_with(|| Candidate {
                    file: hit.key.file.clone(),
                    start_line: hit.key.start_line,
                    end_line: hit.key.end_line,
                    symbol_name: Some(hit.qualified_name.clone()),
                    score,
                    origin: SourceOrigin::Vector,
                });
        }

        let mut candidates: Vec<Candidate> = merged.into_values().collect();
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file.cmp(&b.file))
                .then_with(|| a.start_line.cmp(&b.start_line))
        });
        candidates.truncate(self.cfg.final_k);

        // Hydrate in rank order; a failed fetch keeps its slot with a
        // placeholder so citation numbering stays stable.
        let mut sources = Vec::with_capacity(candidates.len());
        for (i, c) in candidates.into_iter().enumerate() {
            cancel.check()?;
            let content = match self
                .snippets
                .fetch(repo, commit, &c.file, c.start_line, c.end_line)
                .await
            {
                Ok(text) => text,
                Err(err) => fetch_placeholder(&err),
            };
            sources.push(SourceUnit {
                source_index: i + 1,
                file: c.file,
                start_line: c.start_line,
                end_line: c.end_line,
                content,
                symbol_name: c.symbol_name,
                score: c.score,
                source_type: c.origin,
            });
        }

        debug!(repo = %repo, sources = sources.len(), "retrieval done");
        Ok(Retrieval {
            sources,
            embedding_tokens: embedding.token_count,
        })
    }
}
