//! Pull-request review orchestration.
//!
//! Stages, each logged: fetch diff → compute added-line sets → run the
//! detector battery per changed file → phrase the top critical findings →
//! assemble the report. Detection never depends on the model; phrasing is
//! enrichment only.

pub mod diff;
pub mod report;

pub use diff::{Hunk, added_lines, looks_like_binary_patch, parse_patch};
pub use report::{ReviewReport, ReviewVerdict, ReviewedFinding, SeverityCounts, SkippedFile};

use std::collections::HashSet;
use std::sync::Arc;

use answerer::{Answerer, PhrasingInput};
use index_store::RepoId;
use risk_analyzer::{Analyzer, Severity};
use serde_json::json;
use services::{CancelToken, Cancelled, MeterEvent, MeterRecord, MeteringSink, NullMeter};
use source_access::{ChangeStatus, ProviderError, SourceProvider};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// The diff itself could not be fetched; per-file failures only skip
    /// the file.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, ReviewError>;

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Phrasing budget for critical findings.
    pub max_critical_explanations: usize,
    /// When set, line-scoped detectors see only added lines.
    pub diff_only: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_critical_explanations: 5,
            diff_only: true,
        }
    }
}

pub struct ReviewOrchestrator {
    provider: Arc<dyn SourceProvider>,
    analyzer: Analyzer,
    /// Absent in detector-only deployments; findings stand without it.
    answerer: Option<Arc<Answerer>>,
    meter: Arc<dyn MeteringSink>,
    cfg: ReviewConfig,
}

impl ReviewOrchestrator {
    pub fn new(provider: Arc<dyn SourceProvider>, analyzer: Analyzer, cfg: ReviewConfig) -> Self {
        Self {
            provider,
            analyzer,
            answerer: None,
            meter: Arc::new(NullMeter),
            cfg,
        }
    }

    pub fn with_answerer(mut self, answerer: Arc<Answerer>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    pub fn with_meter(mut self, meter: Arc<dyn MeteringSink>) -> Self {
        self.meter = meter;
        self
    }

    /// Reviews one pull request and returns the assembled report.
    pub async fn run_review(
        &self,
        repo: &RepoId,
        pr_number: u64,
        cancel: &CancelToken,
    ) -> Result<ReviewReport> {
        info!(repo = %repo, pr_number, "review start: fetching diff");
        let diff = self.provider.get_diff(repo, pr_number).await?;
        debug!(files = diff.files.len(), head = %diff.head_commit, "diff fetched");

        let mut findings = Vec::new();
        let mut skipped = Vec::new();

        for file in &diff.files {
            cancel.check()?;
            if file.status == ChangeStatus::Removed {
                continue;
            }

            let added: HashSet<u32> = match &file.patch {
                Some(patch) if !looks_like_binary_patch(patch) => added_lines(patch),
                _ => HashSet::new(),
            };

            let content = match self
                .provider
                .get_file(repo, &diff.head_commit, &file.path)
                .await
            {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(err) => {
                    warn!(path = %file.path, %err, "file skipped");
                    skipped.push(SkippedFile {
                        path: file.path.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let scope = self.cfg.diff_only.then_some(&added);
            let mut file_findings = self.analyzer.analyze(&file.path, &content, scope);
            debug!(path = %file.path, count = file_findings.len(), "file analyzed");
            findings.append(&mut file_findings);
        }

        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.file_path.cmp(&b.file_path))
                .then_with(|| a.start_line.cmp(&b.start_line))
        });

        let mut reviewed: Vec<ReviewedFinding> = findings
            .into_iter()
            .map(|finding| ReviewedFinding {
                finding,
                explanation: None,
                suggested_fix: None,
            })
            .collect();

        let (input_tokens, output_tokens) = self.phrase_criticals(&mut reviewed, cancel).await?;

        let counts = ReviewReport::count(&reviewed);
        let verdict = if counts.critical > 0 {
            ReviewVerdict::RequestChanges
        } else {
            ReviewVerdict::Comment
        };

        self.meter
            .record(MeterRecord {
                event: MeterEvent::PrReview,
                input_tokens,
                output_tokens,
                embedding_tokens: 0,
                metadata: json!({
                    "repo": repo.to_string(),
                    "pr_number": pr_number,
                    "head_sha": diff.head_commit,
                    "critical": counts.critical,
                }),
            })
            .await;

        info!(
            repo = %repo,
            pr_number,
            critical = counts.critical,
            warning = counts.warning,
            info = counts.info,
            ?verdict,
            "review done"
        );

        Ok(ReviewReport {
            repo: repo.clone(),
            pr_number,
            base_commit: diff.base_commit,
            head_commit: diff.head_commit,
            counts,
            findings: reviewed,
            skipped_files: skipped,
            verdict,
        })
    }

    /// Phrases up to the configured number of critical findings. A failed
    /// phrasing leaves the finding bare; it never invalidates it.
    async fn phrase_criticals(
        &self,
        reviewed: &mut [ReviewedFinding],
        cancel: &CancelToken,
    ) -> Result<(u64, u64)> {
        let Some(answerer) = &self.answerer else {
            return Ok((0, 0));
        };

        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;
        let mut budget = self.cfg.max_critical_explanations;

        for item in reviewed.iter_mut() {
            if budget == 0 {
                break;
            }
            if item.finding.severity != Severity::Critical {
                continue;
            }
            cancel.check()?;
            budget -= 1;

            let category = serde_json::to_value(item.finding.category)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let input = PhrasingInput {
                category: &category,
                file: &item.finding.file_path,
                line: item.finding.start_line,
                reason: &item.finding.evidence.reason,
                snippet: &item.finding.evidence.snippet,
            };

            match answerer.phrase_finding(&input, cancel).await {
                Ok(outcome) => {
                    input_tokens += outcome.usage.input_tokens;
                    output_tokens += outcome.usage.output_tokens;
                    if let Some(phrasing) = outcome.phrasing {
                        item.explanation = Some(phrasing.explanation);
                        item.suggested_fix = Some(phrasing.suggested_fix);
                    }
                }
                Err(answerer::AnswerError::Cancelled(c)) => return Err(c.into()),
                Err(err) => {
                    warn!(%err, "phrasing failed; finding kept without explanation");
                }
            }
        }
        Ok((input_tokens, output_tokens))
    }
}
