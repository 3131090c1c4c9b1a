//! Embedded-chunk store with cosine top-k search.
//!
//! The vector database engine is a deployment concern behind
//! [`VectorStore`]; the in-memory implementation enforces the deployment's
//! fixed embedding dimension and deterministic result ordering.

pub mod chunking;
pub mod errors;

pub use chunking::{Chunk, ChunkKey, ChunkingPolicy, chunk_symbols};
pub use errors::{Result, VectorError};

use std::collections::HashMap;

use async_trait::async_trait;
use index_store::RepoId;
use php_indexer::SymbolKind;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// One vector plus inspection payload, keyed by chunk identity.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub key: ChunkKey,
    pub vector: Vec<f32>,
    pub kind: SymbolKind,
    pub qualified_name: String,
}

/// One nearest-neighbor hit, score descending in result lists.
#[derive(Debug, Clone, Serialize)]
pub struct VectorHit {
    pub key: ChunkKey,
    pub kind: SymbolKind,
    pub qualified_name: String,
    /// Cosine similarity in `-1.0..=1.0`.
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upserts a batch; rejects vectors whose length differs from the
    /// deployment dimension.
    async fn upsert_vectors(&self, repo: &RepoId, batch: Vec<VectorRecord>) -> Result<()>;

    /// Drops every vector for `repo` and installs the new batch in one
    /// step; pairs with the metadata generation swap. Returns the
    /// displaced records so a caller whose metadata swap fails afterward
    /// can reinstate them.
    async fn replace_repo(&self, repo: &RepoId, batch: Vec<VectorRecord>)
    -> Result<Vec<VectorRecord>>;

    /// Top-k cosine neighbors, deterministic tie-breaks (file, start).
    async fn search(&self, repo: &RepoId, query: &[f32], k: usize) -> Result<Vec<VectorHit>>;
}

/// In-memory [`VectorStore`] with a fixed dimension.
#[derive(Debug)]
pub struct MemoryVectorStore {
    dimension: usize,
    repos: RwLock<HashMap<RepoId, HashMap<ChunkKey, VectorRecord>>>,
}

impl MemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            repos: RwLock::new(HashMap::new()),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_batch(&self, batch: &[VectorRecord]) -> Result<()> {
        for record in batch {
            if record.vector.len() != self.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: self.dimension,
                    got: record.vector.len(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_vectors(&self, repo: &RepoId, batch: Vec<VectorRecord>) -> Result<()> {
        self.check_batch(&batch)?;
        let mut repos = self.repos.write().await;
        let entry = repos.entry(repo.clone()).or_default();
        let count = batch.len();
        for record in batch {
            entry.insert(record.key.clone(), record);
        }
        debug!(repo = %repo, count, total = entry.len(), "vectors upserted");
        Ok(())
    }

    async fn replace_repo(
        &self,
        repo: &RepoId,
        batch: Vec<VectorRecord>,
    ) -> Result<Vec<VectorRecord>> {
        self.check_batch(&batch)?;
        let mut map = HashMap::with_capacity(batch.len());
        for record in batch {
            map.insert(record.key.clone(), record);
        }
        let displaced = self
            .repos
            .write()
            .await
            .insert(repo.clone(), map)
            .map(|old| old.into_values().collect())
            .unwrap_or_default();
        Ok(displaced)
    }

    async fn search(&self, repo: &RepoId, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        if query.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        let repos = self.repos.read().await;
        let Some(entry) = repos.get(repo) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<VectorHit> = entry
            .values()
            .map(|record| VectorHit {
                key: record.key.clone(),
                kind: record.kind,
                qualified_name: record.qualified_name.clone(),
                score: cosine(query, &record.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.file.cmp(&b.key.file))
                .then_with(|| a.key.start_line.cmp(&b.key.start_line))
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// Cosine similarity; zero-norm inputs score 0 rather than NaN.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
