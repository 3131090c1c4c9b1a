//! GitHub provider (REST v3) for tree listings, raw file content, and
//! pull-request diffs.
//!
//! Endpoints used:
//! - GET /repos/{owner}/{repo}/git/trees/{commit}?recursive=1
//! - GET /repos/{owner}/{repo}/contents/{path}?ref={commit}  (raw accept)
//! - GET /repos/{owner}/{repo}/pulls/{number}
//! - GET /repos/{owner}/{repo}/pulls/{number}/files  ("patch" is unified diff)

use async_trait::async_trait;
use index_store::RepoId;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use crate::errors::{ProviderError, Result};
use crate::provider::SourceProvider;
use crate::types::{ChangeStatus, DiffFile, FileEntry, PullRequestDiff};

const FILES_PER_PAGE: usize = 100;

#[derive(Debug, Clone)]
pub struct GitHubProvider {
    http: Client,
    base_api: String,
}

impl GitHubProvider {
    /// Builds a client against `https://api.github.com`. The token is
    /// installed as a default header; request URLs never carry it.
    pub fn new(token: Option<&str>) -> Result<Self> {
        Self::with_base("https://api.github.com", token)
    }

    /// Custom API root for GitHub Enterprise deployments.
    pub fn with_base(base_api: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("repo-witness"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ProviderError::Unauthorized)?;
            headers.insert(AUTHORIZATION, value);
        }
        let http = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(ProviderError::from_transport)?;
        Ok(Self {
            http,
            base_api: base_api.trim_end_matches('/').to_string(),
        })
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        Err(ProviderError::from_status(status, retry_after))
    }
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct PullResponse {
    base: PullRef,
    head: PullRef,
}

#[derive(Deserialize)]
struct PullRef {
    sha: String,
}

#[derive(Deserialize)]
struct PullFile {
    filename: String,
    #[serde(default)]
    previous_filename: Option<String>,
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

#[async_trait]
impl SourceProvider for GitHubProvider {
    async fn list_files(&self, repo: &RepoId, commit: &str) -> Result<Vec<FileEntry>> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.base_api,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            urlencoding::encode(commit),
        );
        debug!(repo = %repo, commit, "GET tree");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;
        let body: TreeResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(body
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob")
            .map(|e| FileEntry {
                path: e.path,
                blob_sha: e.sha,
                size_bytes: e.size.unwrap_or(0),
            })
            .collect())
    }

    async fn get_file(&self, repo: &RepoId, commit: &str, path: &str) -> Result<Vec<u8>> {
        // Encode per segment; the `/` separators must survive.
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.base_api,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            encoded_path,
            urlencoding::encode(commit),
        );
        debug!(repo = %repo, commit, path, "GET contents");
        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github.raw+json")
            .send()
            .await
            .map_err(ProviderError::from_transport)?;
        let bytes = Self::check(resp)
            .await?
            .bytes()
            .await
            .map_err(ProviderError::from_transport)?;
        Ok(bytes.to_vec())
    }

    async fn get_diff(&self, repo: &RepoId, pr_number: u64) -> Result<PullRequestDiff> {
        let pull_url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.base_api,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name),
            pr_number,
        );
        debug!(repo = %repo, pr_number, "GET pull");
        let resp = self
            .http
            .get(pull_url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;
        let pull: PullResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let mut files = Vec::new();
        let mut page = 1u32;
        loop {
            let files_url = format!(
                "{}/repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                self.base_api,
                urlencoding::encode(&repo.owner),
                urlencoding::encode(&repo.name),
                pr_number,
                FILES_PER_PAGE,
                page,
            );
            let resp = self
                .http
                .get(files_url)
                .send()
                .await
                .map_err(ProviderError::from_transport)?;
            let batch: Vec<PullFile> = Self::check(resp)
                .await?
                .json()
                .await
                .map_err(|e| ProviderError::Decode(e.to_string()))?;
            let batch_len = batch.len();

            for f in batch {
                let status = match f.status.as_str() {
                    "added" => ChangeStatus::Added,
                    "removed" => ChangeStatus::Removed,
                    "renamed" => ChangeStatus::Renamed,
                    _ => ChangeStatus::Modified,
                };
                files.push(DiffFile {
                    path: f.filename,
                    old_path: f.previous_filename,
                    status,
                    patch: f.patch,
                });
            }

            if batch_len < FILES_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(PullRequestDiff {
            base_commit: pull.base.sha,
            head_commit: pull.head.sha,
            files,
        })
    }
}
