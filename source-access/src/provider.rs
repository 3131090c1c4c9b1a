//! The source provider boundary and an in-memory fixture implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use index_store::RepoId;
use tokio::sync::RwLock;

use crate::errors::{ProviderError, Result};
use crate::types::{FileEntry, PullRequestDiff};

/// Read-only access to hosted repository content.
///
/// Implementations must never embed credentials in URLs; auth material
/// travels in headers supplied out-of-band.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn list_files(&self, repo: &RepoId, commit: &str) -> Result<Vec<FileEntry>>;

    async fn get_file(&self, repo: &RepoId, commit: &str, path: &str) -> Result<Vec<u8>>;

    async fn get_diff(&self, repo: &RepoId, pr_number: u64) -> Result<PullRequestDiff>;
}

/// Deterministic provider backed by maps; fixtures for tests and local
/// runs without network access.
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    // (repo, commit) -> path -> content
    files: RwLock<HashMap<(RepoId, String), HashMap<String, Vec<u8>>>>,
    // (repo, pr) -> diff
    diffs: RwLock<HashMap<(RepoId, u64), PullRequestDiff>>,
    calls: RwLock<u64>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_file(&self, repo: &RepoId, commit: &str, path: &str, content: &str) {
        self.files
            .write()
            .await
            .entry((repo.clone(), commit.to_string()))
            .or_default()
            .insert(path.to_string(), content.as_bytes().to_vec());
    }

    pub async fn put_diff(&self, repo: &RepoId, pr_number: u64, diff: PullRequestDiff) {
        self.diffs
            .write()
            .await
            .insert((repo.clone(), pr_number), diff);
    }

    /// Number of `get_file` calls served; lets tests assert cache hits.
    pub async fn fetch_count(&self) -> u64 {
        *self.calls.read().await
    }
}

#[async_trait]
impl SourceProvider for InMemoryProvider {
    async fn list_files(&self, repo: &RepoId, commit: &str) -> Result<Vec<FileEntry>> {
        let files = self.files.read().await;
        let tree = files
            .get(&(repo.clone(), commit.to_string()))
            .ok_or(ProviderError::NotFound)?;
        let mut entries: Vec<FileEntry> = tree
            .iter()
            .map(|(path, content)| FileEntry {
                path: path.clone(),
                blob_sha: blob_sha(content),
                size_bytes: content.len() as u64,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn get_file(&self, repo: &RepoId, commit: &str, path: &str) -> Result<Vec<u8>> {
        *self.calls.write().await += 1;
        self.files
            .read()
            .await
            .get(&(repo.clone(), commit.to_string()))
            .and_then(|tree| tree.get(path).cloned())
            .ok_or(ProviderError::NotFound)
    }

    async fn get_diff(&self, repo: &RepoId, pr_number: u64) -> Result<PullRequestDiff> {
        self.diffs
            .read()
            .await
            .get(&(repo.clone(), pr_number))
            .cloned()
            .ok_or(ProviderError::NotFound)
    }
}

/// Stable 40-hex blob id for fixture entries, shaped like what real
/// providers return.
fn blob_sha(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut h = Sha256::new();
    h.update(bytes);
    let hex = format!("{:x}", h.finalize());
    hex[..40].to_string()
}
