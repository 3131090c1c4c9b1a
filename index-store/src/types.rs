//! Store-level entities: repositories, file metadata, generations.
//!
//! No source bodies are stored anywhere here; every record points at a
//! line range that the snippet layer resolves on demand.

use std::fmt;

use php_indexer::{HttpMethod, Migration, Route, Symbol};
use serde::{Deserialize, Serialize};

/// Repository identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Indexing lifecycle of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    Pending,
    Indexing,
    Ready,
    Failed,
}

/// Registry row for one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub default_branch: String,
    /// 40-hex commit of the visible generation; `None` until first index.
    pub last_indexed_commit: Option<String>,
    pub status: RepoStatus,
    /// Last indexing error, kept for operators when status is `failed`.
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-file metadata refreshed on every indexing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub blob_sha: String,
    pub language: String,
    pub size_bytes: u64,
}

/// The complete structural output of one indexing run at one commit.
/// Swapped in atomically; readers never observe a partial generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationPayload {
    pub files: Vec<FileRecord>,
    pub symbols: Vec<Symbol>,
    pub routes: Vec<Route>,
    pub migrations: Vec<Migration>,
}

impl GenerationPayload {
    /// Staged writes during indexing; the names mirror what a relational
    /// backend would expose as row upserts.
    pub fn upsert_file(&mut self, file: FileRecord) {
        if let Some(existing) = self.files.iter_mut().find(|f| f.path == file.path) {
            *existing = file;
        } else {
            self.files.push(file);
        }
    }

    pub fn upsert_symbol(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    pub fn upsert_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn upsert_migration(&mut self, migration: Migration) {
        self.migrations.push(migration);
    }

    /// Canonical serialized form; equal payloads serialize byte-equal,
    /// which pins indexing idempotence in tests.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One trigram search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolHit {
    pub symbol: Symbol,
    /// Normalized to `0.0..=1.0`.
    pub score: f32,
}

/// Route listing filter; all fields conjunctive.
#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub method: Option<HttpMethod>,
    pub uri_contains: Option<String>,
    pub name_contains: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        if let Some(m) = self.method {
            if route.method != m {
                return false;
            }
        }
        if let Some(uri) = &self.uri_contains {
            if !route.full_uri.contains(uri.as_str()) {
                return false;
            }
        }
        if let Some(name) = &self.name_contains {
            match &route.name {
                Some(n) if n.contains(name.as_str()) => {}
                _ => return false,
            }
        }
        true
    }
}
