//! Indexing pipeline: one idempotent run per `(repo, commit)`.
//!
//! Stages, each logged with timing:
//! 1. enumerate files from the provider, honoring the scan skiplist;
//! 2. parse PHP sources on blocking tasks (tree-sitter is CPU-bound);
//! 3. chunk symbols and embed the chunks;
//! 4. finalize: vector batch, then the atomic metadata generation swap;
//!    a failed metadata swap reinstates the displaced vector batch.
//!
//! Any failure or cancellation marks the repository `failed` and leaves
//! the previously visible generation untouched in both stores.

use std::sync::Arc;
use std::time::Instant;

use index_store::{FileRecord, GenerationPayload, IndexStore, RepoId, RepoStatus};
use llm_service::EmbeddingModel;
use php_indexer::{FileExtract, ParseIssue, language_of_path};
use serde_json::json;
use services::{CancelToken, Cancelled, MeterEvent, MeterRecord, MeteringSink, NullMeter};
use source_access::{ProviderError, SourceProvider};
use thiserror::Error;
use tracing::{debug, info, warn};
use vector_store::{ChunkingPolicy, VectorRecord, VectorStore, chunk_symbols};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("another indexing run holds the lease for {repo}")]
    ConcurrentRun { repo: RepoId },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("index store error: {0}")]
    Index(#[from] index_store::IndexError),

    #[error("vector store error: {0}")]
    Vector(#[from] vector_store::VectorError),

    #[error("embedding failed: {0}")]
    Embed(#[from] llm_service::LlmError),

    #[error("parser task failed: {0}")]
    ParserTask(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Path fragments excluded from enumeration. Mirrors the analyzer's scan
/// exemptions: vendored and generated trees carry no indexable facts.
const ENUMERATION_SKIPLIST: &[&str] = &[
    "/vendor/",
    "/node_modules/",
    "/storage/framework/",
    "/public/build/",
    "/dist/",
    "/.git/",
    "__pycache__",
    ".min.js",
    ".min.css",
    ".map",
    ".lock",
];

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Deployment-specific skip fragments on top of the built-in list.
    pub extra_skip_paths: Vec<String>,
    pub chunking: ChunkingPolicy,
}

/// Summary of one completed run.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub commit: String,
    pub files: usize,
    pub symbols: usize,
    pub routes: usize,
    pub migrations: usize,
    pub chunks: usize,
    pub parse_issues: Vec<ParseIssue>,
    /// True when the commit was already indexed and the run short-circuited.
    pub already_indexed: bool,
}

pub struct IndexPipeline {
    provider: Arc<dyn SourceProvider>,
    index: Arc<dyn IndexStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingModel>,
    meter: Arc<dyn MeteringSink>,
    cfg: PipelineConfig,
}

impl IndexPipeline {
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        index: Arc<dyn IndexStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingModel>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            index,
            vectors,
            embedder,
            meter: Arc::new(NullMeter),
            cfg,
        }
    }

    pub fn with_meter(mut self, meter: Arc<dyn MeteringSink>) -> Self {
        self.meter = meter;
        self
    }

    /// Indexes `repo` at `commit`. Re-running an already-indexed commit
    /// returns immediately; the scheduler may deliver duplicates.
    pub async fn run(
        &self,
        repo: &RepoId,
        default_branch: &str,
        commit: &str,
        cancel: &CancelToken,
    ) -> Result<IndexOutcome> {
        let repository = self.index.upsert_repository(repo, default_branch).await?;
        if repository.status == RepoStatus::Ready
            && repository.last_indexed_commit.as_deref() == Some(commit)
        {
            info!(repo = %repo, commit, "commit already indexed; skipping");
            return Ok(IndexOutcome {
                commit: commit.to_string(),
                files: 0,
                symbols: 0,
                routes: 0,
                migrations: 0,
                chunks: 0,
                parse_issues: Vec::new(),
                already_indexed: true,
            });
        }

        if !self.index.acquire_index_lease(repo, commit).await? {
            return Err(PipelineError::ConcurrentRun { repo: repo.clone() });
        }
        self.index
            .set_status(repo, RepoStatus::Indexing, None)
            .await?;

        let outcome = self.run_leased(repo, commit, cancel).await;
        self.index.release_index_lease(repo, commit).await?;

        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // The previous generation stays visible; only the status
                // records the failure.
                warn!(repo = %repo, commit, %err, "indexing failed");
                self.index
                    .set_status(repo, RepoStatus::Failed, Some(err.to_string()))
                    .await?;
                Err(err)
            }
        }
    }

    async fn run_leased(
        &self,
        repo: &RepoId,
        commit: &str,
        cancel: &CancelToken,
    ) -> Result<IndexOutcome> {
        let t0 = Instant::now();
        let entries = self.provider.list_files(repo, commit).await?;
        let total = entries.len();

        let mut payload = GenerationPayload::default();
        let mut parse_issues = Vec::new();

        for entry in entries {
            cancel.check()?;
            if self.is_skipped(&entry.path) {
                continue;
            }

            payload.upsert_file(FileRecord {
                path: entry.path.clone(),
                blob_sha: entry.blob_sha.clone(),
                language: language_of_path(&entry.path).to_string(),
                size_bytes: entry.size_bytes,
            });

            if !entry.path.ends_with(".php") {
                continue;
            }

            let bytes = match self.provider.get_file(repo, commit, &entry.path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(path = %entry.path, %err, "file fetch failed; skipped");
                    continue;
                }
            };

            let path = entry.path.clone();
            let source = String::from_utf8_lossy(&bytes).into_owned();
            let extract: FileExtract =
                tokio::task::spawn_blocking(move || php_indexer::extract_file(&path, &source))
                    .await
                    .map_err(|e| PipelineError::ParserTask(e.to_string()))?
                    .map_err(|e| PipelineError::ParserTask(e.to_string()))?;

            parse_issues.extend(extract.issues);
            for symbol in extract.symbols {
                payload.upsert_symbol(symbol);
            }
            for route in extract.routes {
                payload.upsert_route(route);
            }
            if let Some(migration) = extract.migration {
                payload.upsert_migration(migration);
            }
        }
        debug!(
            repo = %repo,
            listed = total,
            kept = payload.files.len(),
            symbols = payload.symbols.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "parse stage done"
        );

        // Embedding stage.
        let chunks = chunk_symbols(&payload.symbols, self.cfg.chunking);
        let mut embedding_tokens = 0u64;
        let mut records = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            cancel.check()?;
            let embedding = self.embedder.embed(&chunk.text).await?;
            embedding_tokens += embedding.token_count;
            records.push(VectorRecord {
                key: chunk.key.clone(),
                vector: embedding.vector,
                kind: chunk.kind,
                qualified_name: chunk.qualified_name.clone(),
            });
        }
        debug!(repo = %repo, chunks = records.len(), embedding_tokens, "embedding stage done");

        // Finalize: vectors first, then the metadata swap that makes the
        // generation visible. If the metadata swap fails, the displaced
        // vector batch is reinstated so both stores keep serving the old
        // commit.
        let outcome = IndexOutcome {
            commit: commit.to_string(),
            files: payload.files.len(),
            symbols: payload.symbols.len(),
            routes: payload.routes.len(),
            migrations: payload.migrations.len(),
            chunks: records.len(),
            parse_issues,
            already_indexed: false,
        };
        let displaced = self.vectors.replace_repo(repo, records).await?;
        if let Err(err) = self.index.replace_all_for_repo(repo, commit, payload).await {
            if let Err(rollback_err) = self.vectors.replace_repo(repo, displaced).await {
                warn!(
                    repo = %repo,
                    %rollback_err,
                    "vector rollback failed after metadata swap failure"
                );
            }
            return Err(err.into());
        }

        self.meter
            .record(MeterRecord {
                event: MeterEvent::Indexed,
                input_tokens: 0,
                output_tokens: 0,
                embedding_tokens,
                metadata: json!({
                    "repo": repo.to_string(),
                    "commit": commit,
                    "files": outcome.files,
                    "symbols": outcome.symbols,
                }),
            })
            .await;

        info!(
            repo = %repo,
            commit,
            files = outcome.files,
            symbols = outcome.symbols,
            routes = outcome.routes,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "generation finalized"
        );
        Ok(outcome)
    }

    fn is_skipped(&self, path: &str) -> bool {
        let rooted = format!("/{}", path.trim_start_matches('/'));
        ENUMERATION_SKIPLIST
            .iter()
            .any(|frag| rooted.contains(frag))
            || self
                .cfg
                .extra_skip_paths
                .iter()
                .any(|frag| rooted.contains(frag))
    }
}
