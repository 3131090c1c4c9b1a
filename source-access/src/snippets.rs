//! On-demand snippet retrieval with a bounded TTL cache.
//!
//! The commit is part of the cache key, so cached text is immutable for
//! its lifetime; races between writers of the same key are benign.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use index_store::RepoId;
use serde_json::json;
use services::{MeterEvent, MeterRecord, MeteringSink, NullMeter};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::errors::{ProviderError, Result};
use crate::provider::SourceProvider;

/// Marker appended when a snippet was cut at the character budget.
const TRUNCATION_MARKER: &str = "...";

/// Full identity of one cached snippet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnippetKey {
    pub repo: RepoId,
    pub commit: String,
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    text: String,
    expires_at: Instant,
}

/// Fetches literal source text for `(commit, path, line-range)` tuples.
pub struct SnippetFetcher {
    provider: Arc<dyn SourceProvider>,
    cache: RwLock<HashMap<SnippetKey, CacheEntry>>,
    ttl: Duration,
    max_chars: usize,
    meter: Arc<dyn MeteringSink>,
}

impl SnippetFetcher {
    pub fn new(provider: Arc<dyn SourceProvider>, ttl: Duration, max_chars: usize) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
            ttl,
            max_chars,
            meter: Arc::new(NullMeter),
        }
    }

    pub fn with_meter(mut self, meter: Arc<dyn MeteringSink>) -> Self {
        self.meter = meter;
        self
    }

    /// Returns the literal text of `[start_line, end_line]` (1-indexed,
    /// inclusive), truncated to the character budget with a marker.
    /// Expired entries are refetched, never served.
    pub async fn fetch(
        &self,
        repo: &RepoId,
        commit: &str,
        path: &str,
        start_line: u32,
        end_line: u32,
    ) -> Result<String> {
        let key = SnippetKey {
            repo: repo.clone(),
            commit: commit.to_string(),
            path: path.to_string(),
            start_line,
            end_line,
        };

        if let Some(entry) = self.cache.read().await.get(&key) {
            if entry.expires_at > Instant::now() {
                trace!(path, start_line, end_line, "snippet cache hit");
                return Ok(entry.text.clone());
            }
        }

        let bytes = self.provider.get_file(repo, commit, path).await?;
        let content = String::from_utf8_lossy(&bytes);
        let text = self.slice(&content, start_line, end_line);

        self.meter
            .record(MeterRecord::event_only(
                MeterEvent::SnippetFetch,
                json!({ "repo": repo.to_string(), "path": path }),
            ))
            .await;

        debug!(path, start_line, end_line, chars = text.len(), "snippet fetched");
        self.cache.write().await.insert(
            key,
            CacheEntry {
                text: text.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(text)
    }

    fn slice(&self, content: &str, start_line: u32, end_line: u32) -> String {
        let start = start_line.max(1) as usize - 1;
        let take = (end_line.max(start_line) as usize).saturating_sub(start);
        let mut text = content
            .lines()
            .skip(start)
            .take(take)
            .collect::<Vec<_>>()
            .join("\n");

        if text.len() > self.max_chars {
            let mut end = self.max_chars;
            while end > 0 && !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// The placeholder embedded into a source slot when its snippet could not
/// be fetched. The slot stays visible so citation numbering is stable.
pub fn fetch_placeholder(err: &ProviderError) -> String {
    format!("[Could not fetch: {err}]")
}
