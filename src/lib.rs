//! Evidence-grounded code Q&A and pull-request risk review for
//! Laravel-style repositories.
//!
//! The facade wires the three trust layers together:
//! detection (AST extraction + exact-pattern analysis) produces ground
//! truth, hybrid retrieval surfaces it, and the constrained answerer may
//! only phrase what the numbered sources establish. Nothing reaches a
//! caller without a `(file, line-range, snippet)` behind it.

pub mod config;

pub use config::WitnessConfig;

use std::sync::Arc;

use answerer::{Answerer, AnswererConfig};
use index_pipeline::{IndexOutcome, IndexPipeline, PipelineConfig, PipelineError};
use index_store::{IndexStore, MemoryIndexStore, RepoId, RepoStatus};
use llm_service::{EmbeddingModel, LanguageModel};
use pr_reviewer::{ReviewError, ReviewOrchestrator, ReviewReport};
use retriever::{RetrieveError, Retriever, SourceUnit};
use risk_analyzer::Analyzer;
use serde::Serialize;
use services::{CancelToken, MeterEvent, MeterRecord, MeteringSink, NullMeter};
use source_access::{SnippetFetcher, SourceProvider};
use thiserror::Error;
use tracing::info;
use vector_store::MemoryVectorStore;

#[derive(Debug, Error)]
pub enum WitnessError {
    /// The repository has no ready generation to answer from.
    #[error("repository {repo} is not indexed (status: {status:?})")]
    NotIndexed {
        repo: RepoId,
        status: Option<RepoStatus>,
    },

    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error(transparent)]
    Answer(#[from] answerer::AnswerError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Index(#[from] index_store::IndexError),
}

pub type Result<T> = std::result::Result<T, WitnessError>;

/// A question answered with its evidence trail.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionOutcome {
    pub answer: answerer::Answer,
    /// Flat text with bracketed source references.
    pub rendered: String,
    /// The numbered sources the answer may cite.
    pub sources: Vec<SourceUnit>,
}

/// Wired application core. Storage engines are in-process; the source
/// provider and both models arrive as collaborators.
pub struct Witness {
    index: Arc<MemoryIndexStore>,
    pipeline: IndexPipeline,
    retriever: Retriever,
    answerer: Arc<Answerer>,
    reviewer: ReviewOrchestrator,
    meter: Arc<dyn MeteringSink>,
}

impl Witness {
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingModel>,
        cfg: WitnessConfig,
    ) -> Self {
        Self::with_meter(provider, model, embedder, cfg, Arc::new(NullMeter))
    }

    pub fn with_meter(
        provider: Arc<dyn SourceProvider>,
        model: Arc<dyn LanguageModel>,
        embedder: Arc<dyn EmbeddingModel>,
        cfg: WitnessConfig,
        meter: Arc<dyn MeteringSink>,
    ) -> Self {
        let index = Arc::new(MemoryIndexStore::new());
        let vectors = Arc::new(MemoryVectorStore::new(cfg.embedding_dim));
        let snippets = Arc::new(
            SnippetFetcher::new(provider.clone(), cfg.snippet_ttl, cfg.snippet_max_chars)
                .with_meter(meter.clone()),
        );

        let pipeline = IndexPipeline::new(
            provider.clone(),
            index.clone(),
            vectors.clone(),
            embedder.clone(),
            PipelineConfig {
                extra_skip_paths: cfg.skip_paths.clone(),
                chunking: cfg.chunking,
            },
        )
        .with_meter(meter.clone());

        let retriever = Retriever::new(
            index.clone(),
            vectors,
            snippets,
            embedder,
            cfg.retriever.clone(),
        );

        let answerer = Arc::new(Answerer::new(
            model,
            AnswererConfig {
                max_tokens: cfg.answerer.max_tokens,
                retry_on_parse_failure: cfg.answerer.retry_on_parse_failure,
            },
        ));

        let reviewer = ReviewOrchestrator::new(
            provider,
            Analyzer::with_skip_paths(cfg.skip_paths.clone()),
            cfg.review.clone(),
        )
        .with_answerer(answerer.clone())
        .with_meter(meter.clone());

        Self {
            index,
            pipeline,
            retriever,
            answerer,
            reviewer,
            meter,
        }
    }

    /// Indexes `repo` at `commit`; idempotent per commit.
    pub async fn index_repository(
        &self,
        repo: &RepoId,
        default_branch: &str,
        commit: &str,
        cancel: &CancelToken,
    ) -> Result<IndexOutcome> {
        Ok(self.pipeline.run(repo, default_branch, commit, cancel).await?)
    }

    /// Answers a question about an indexed repository with citations.
    pub async fn answer_question(
        &self,
        repo: &RepoId,
        question: &str,
        cancel: &CancelToken,
    ) -> Result<QuestionOutcome> {
        let repository = self.index.repository(repo).await?;
        let commit = match &repository {
            Some(row) if row.status == RepoStatus::Ready => row
                .last_indexed_commit
                .clone()
                .ok_or_else(|| WitnessError::NotIndexed {
                    repo: repo.clone(),
                    status: Some(row.status),
                })?,
            other => {
                return Err(WitnessError::NotIndexed {
                    repo: repo.clone(),
                    status: other.as_ref().map(|r| r.status),
                });
            }
        };

        let retrieval = self
            .retriever
            .retrieve(repo, &commit, question, cancel)
            .await?;
        let outcome = self
            .answerer
            .answer(question, &retrieval.sources, cancel)
            .await?;

        self.meter
            .record(MeterRecord {
                event: MeterEvent::Question,
                input_tokens: outcome.usage.input_tokens,
                output_tokens: outcome.usage.output_tokens,
                embedding_tokens: retrieval.embedding_tokens,
                metadata: serde_json::json!({
                    "repo": repo.to_string(),
                    "commit": commit,
                    "confidence": outcome.answer.confidence_tier,
                }),
            })
            .await;

        info!(
            repo = %repo,
            sources = retrieval.sources.len(),
            tier = ?outcome.answer.confidence_tier,
            "question answered"
        );

        Ok(QuestionOutcome {
            rendered: outcome.answer.render(),
            answer: outcome.answer,
            sources: retrieval.sources,
        })
    }

    /// Reviews a pull request; detection never waits on the model.
    pub async fn review_pull_request(
        &self,
        repo: &RepoId,
        pr_number: u64,
        cancel: &CancelToken,
    ) -> Result<ReviewReport> {
        Ok(self.reviewer.run_review(repo, pr_number, cancel).await?)
    }

    /// Read access to repository indexing state.
    pub async fn repository(&self, repo: &RepoId) -> Result<Option<index_store::Repository>> {
        Ok(self.index.repository(repo).await?)
    }

    /// Hands an indexing run to the external task queue. The payload is
    /// idempotent on `(repo, commit)`, so duplicate deliveries are safe.
    pub async fn enqueue_index(
        &self,
        scheduler: &dyn services::Scheduler,
        repo: &RepoId,
        default_branch: &str,
        commit: &str,
    ) -> std::result::Result<(), services::scheduler::ScheduleError> {
        scheduler
            .enqueue(
                "index_repository",
                serde_json::json!({
                    "owner": repo.owner,
                    "name": repo.name,
                    "default_branch": default_branch,
                    "commit": commit,
                }),
            )
            .await
    }
}
