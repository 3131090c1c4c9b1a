//! Structural metadata store with trigram search and atomic generation
//! swap.
//!
//! The relational engine is a deployment concern behind [`IndexStore`];
//! the in-memory implementation here carries the full contract and is the
//! serialization point for indexing runs (status registry + lease).

pub mod errors;
mod trigram;
pub mod types;

pub use errors::{IndexError, Result};
pub use types::{
    FileRecord, GenerationPayload, RepoId, RepoStatus, Repository, RouteFilter, SymbolHit,
};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use php_indexer::{Route, Symbol};
use tokio::sync::RwLock;
use tracing::{debug, info};

use trigram::{SUBSTRING_FLOOR, similarity, trigrams};

/// Store contract. Writers: the indexing pipeline only. Readers observe
/// either the full pre-swap or the full post-swap generation, never a mix.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn upsert_repository(&self, repo: &RepoId, default_branch: &str) -> Result<Repository>;

    async fn repository(&self, repo: &RepoId) -> Result<Option<Repository>>;

    async fn set_status(
        &self,
        repo: &RepoId,
        status: RepoStatus,
        error: Option<String>,
    ) -> Result<()>;

    /// Atomically replaces every symbol/route/migration/file record for
    /// `repo` with the new generation and marks the repository ready.
    /// A payload violating entity invariants is refused wholesale with
    /// [`IndexError::Integrity`]; the previous generation stays visible.
    async fn replace_all_for_repo(
        &self,
        repo: &RepoId,
        commit: &str,
        payload: GenerationPayload,
    ) -> Result<()>;

    /// Symbols ranked by `max(sim(name), sim(qualified_name))` with a
    /// substring floor over `search_text`. Deterministic tie-breaks:
    /// score desc, then file asc, then start_line asc.
    async fn trigram_search(
        &self,
        repo: &RepoId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SymbolHit>>;

    async fn lookup_symbol_by_name(&self, repo: &RepoId, fq_name: &str)
    -> Result<Option<Symbol>>;

    async fn list_routes(&self, repo: &RepoId, filter: &RouteFilter) -> Result<Vec<Route>>;

    /// Serializes indexing runs per repository. Returns `false` when a
    /// run already holds the lease.
    async fn acquire_index_lease(&self, repo: &RepoId, commit: &str) -> Result<bool>;

    async fn release_index_lease(&self, repo: &RepoId, commit: &str) -> Result<()>;
}

#[derive(Debug)]
struct RepoEntry {
    repository: Repository,
    /// Arc-swapped on finalize; clones taken under the read lock keep
    /// serving the old generation to in-flight readers.
    generation: Option<Arc<GenerationPayload>>,
    lease: Option<String>,
}

/// In-memory [`IndexStore`].
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    repos: RwLock<HashMap<RepoId, RepoEntry>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the visible generation, if any.
    pub async fn generation(&self, repo: &RepoId) -> Option<Arc<GenerationPayload>> {
        self.repos.read().await.get(repo)?.generation.clone()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn upsert_repository(&self, repo: &RepoId, default_branch: &str) -> Result<Repository> {
        let mut repos = self.repos.write().await;
        let entry = repos.entry(repo.clone()).or_insert_with(|| RepoEntry {
            repository: Repository {
                id: repo.clone(),
                default_branch: default_branch.to_string(),
                last_indexed_commit: None,
                status: RepoStatus::Pending,
                error: None,
            },
            generation: None,
            lease: None,
        });
        entry.repository.default_branch = default_branch.to_string();
        Ok(entry.repository.clone())
    }

    async fn repository(&self, repo: &RepoId) -> Result<Option<Repository>> {
        Ok(self.repos.read().await.get(repo).map(|e| e.repository.clone()))
    }

    async fn set_status(
        &self,
        repo: &RepoId,
        status: RepoStatus,
        error: Option<String>,
    ) -> Result<()> {
        let mut repos = self.repos.write().await;
        let entry = repos
            .get_mut(repo)
            .ok_or_else(|| IndexError::UnknownRepository(repo.clone()))?;
        entry.repository.status = status;
        entry.repository.error = error;
        Ok(())
    }

    async fn replace_all_for_repo(
        &self,
        repo: &RepoId,
        commit: &str,
        payload: GenerationPayload,
    ) -> Result<()> {
        verify_generation(repo, commit, &payload)?;
        let mut repos = self.repos.write().await;
        let entry = repos
            .get_mut(repo)
            .ok_or_else(|| IndexError::UnknownRepository(repo.clone()))?;
        info!(
            repo = %repo,
            commit,
            files = payload.files.len(),
            symbols = payload.symbols.len(),
            routes = payload.routes.len(),
            migrations = payload.migrations.len(),
            "generation swap"
        );
        entry.generation = Some(Arc::new(payload));
        entry.repository.last_indexed_commit = Some(commit.to_string());
        entry.repository.status = RepoStatus::Ready;
        entry.repository.error = None;
        Ok(())
    }

    async fn trigram_search(
        &self,
        repo: &RepoId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SymbolHit>> {
        let Some(generation) = self.generation(repo).await else {
            return Ok(Vec::new());
        };

        let query_grams = trigrams(query);
        let query_lower = query.to_lowercase();

        let mut hits: Vec<SymbolHit> = generation
            .symbols
            .iter()
            .filter_map(|symbol| {
                let name_score = similarity(&query_grams, &trigrams(&symbol.name));
                let fq_score = similarity(&query_grams, &trigrams(&symbol.qualified_name));
                let mut score = name_score.max(fq_score);
                if !query_lower.is_empty()
                    && symbol.search_text().to_lowercase().contains(&query_lower)
                {
                    score = score.max(SUBSTRING_FLOOR);
                }
                (score > 0.0).then(|| SymbolHit {
                    symbol: symbol.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.file.cmp(&b.symbol.file))
                .then_with(|| a.symbol.start_line.cmp(&b.symbol.start_line))
        });
        hits.truncate(limit);
        debug!(repo = %repo, query, hits = hits.len(), "trigram search");
        Ok(hits)
    }

    async fn lookup_symbol_by_name(
        &self,
        repo: &RepoId,
        fq_name: &str,
    ) -> Result<Option<Symbol>> {
        let Some(generation) = self.generation(repo).await else {
            return Ok(None);
        };
        Ok(generation
            .symbols
            .iter()
            .find(|s| s.qualified_name == fq_name)
            .cloned())
    }

    async fn list_routes(&self, repo: &RepoId, filter: &RouteFilter) -> Result<Vec<Route>> {
        let Some(generation) = self.generation(repo).await else {
            return Ok(Vec::new());
        };
        Ok(generation
            .routes
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn acquire_index_lease(&self, repo: &RepoId, commit: &str) -> Result<bool> {
        let mut repos = self.repos.write().await;
        let entry = repos
            .get_mut(repo)
            .ok_or_else(|| IndexError::UnknownRepository(repo.clone()))?;
        match &entry.lease {
            Some(held) => {
                debug!(repo = %repo, held, commit, "lease denied");
                Ok(false)
            }
            None => {
                entry.lease = Some(commit.to_string());
                Ok(true)
            }
        }
    }

    async fn release_index_lease(&self, repo: &RepoId, commit: &str) -> Result<()> {
        let mut repos = self.repos.write().await;
        if let Some(entry) = repos.get_mut(repo) {
            if entry.lease.as_deref() == Some(commit) {
                entry.lease = None;
            }
        }
        Ok(())
    }
}

/// Entity invariants checked before a generation becomes visible. A
/// payload that fails here is refused wholesale; the previous generation
/// keeps serving readers.
fn verify_generation(
    repo: &RepoId,
    commit: &str,
    payload: &GenerationPayload,
) -> Result<()> {
    let integrity = |reason: String| IndexError::Integrity {
        repo: repo.clone(),
        reason,
    };

    if commit.len() != 40 || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(integrity(format!("commit '{commit}' is not a 40-hex id")));
    }
    for symbol in &payload.symbols {
        if symbol.start_line > symbol.end_line {
            return Err(integrity(format!(
                "symbol '{}' has inverted line span {}-{}",
                symbol.qualified_name, symbol.start_line, symbol.end_line
            )));
        }
    }
    for migration in &payload.migrations {
        if migration.is_destructive != !migration.destructive_operations.is_empty() {
            return Err(integrity(format!(
                "migration '{}' destructive flag disagrees with its operations",
                migration.file_path
            )));
        }
    }
    Ok(())
}
