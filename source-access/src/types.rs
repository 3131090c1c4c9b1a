//! Provider-agnostic data model for file listings and pull-request diffs.

use serde::{Deserialize, Serialize};

/// One entry of a repository tree listing at a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub blob_sha: String,
    pub size_bytes: u64,
}

/// Change status of one file inside a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

/// One changed file with its unified-diff patch text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffFile {
    pub path: String,
    /// Previous path for renames.
    #[serde(default)]
    pub old_path: Option<String>,
    pub status: ChangeStatus,
    /// Unified diff hunks; absent for binary files.
    #[serde(default)]
    pub patch: Option<String>,
}

/// Full diff of a pull request at its head commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestDiff {
    pub base_commit: String,
    pub head_commit: String,
    pub files: Vec<DiffFile>,
}
