//! Source provider boundary, GitHub REST client, and the snippet layer.
//!
//! Everything that touches hosted repository content goes through
//! [`SourceProvider`]; the snippet fetcher adds the bounded TTL cache that
//! keeps evidence hydration cheap.

pub mod errors;
pub mod github;
pub mod provider;
pub mod snippets;
pub mod types;

pub use errors::{ProviderError, Result, sanitize};
pub use github::GitHubProvider;
pub use provider::{InMemoryProvider, SourceProvider};
pub use snippets::{SnippetFetcher, SnippetKey, fetch_placeholder};
pub use types::{ChangeStatus, DiffFile, FileEntry, PullRequestDiff};
