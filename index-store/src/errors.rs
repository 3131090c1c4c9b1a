use thiserror::Error;

use crate::types::RepoId;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("repository {0} is not registered")]
    UnknownRepository(RepoId),

    #[error("indexing lease for {repo} already held for commit {commit}")]
    LeaseHeld { repo: RepoId, commit: String },

    /// Generation finalize failed; the previous generation stays visible.
    #[error("generation swap failed for {repo}: {reason}")]
    Integrity { repo: RepoId, reason: String },
}

pub type Result<T> = std::result::Result<T, IndexError>;
