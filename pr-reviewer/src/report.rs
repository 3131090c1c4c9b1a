//! Review report model and its flat rendering.

use index_store::RepoId;
use risk_analyzer::{Finding, Severity};
use serde::Serialize;

/// Review outcome: any critical finding blocks, anything else comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    RequestChanges,
    Comment,
}

/// A detector finding, optionally enriched by the phrasing pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewedFinding {
    #[serde(flatten)]
    pub finding: Finding,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
}

/// A file the review had to skip, with the sanitized reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReport {
    pub repo: RepoId,
    pub pr_number: u64,
    pub base_commit: String,
    pub head_commit: String,
    pub counts: SeverityCounts,
    pub findings: Vec<ReviewedFinding>,
    pub skipped_files: Vec<SkippedFile>,
    pub verdict: ReviewVerdict,
}

impl ReviewReport {
    pub fn count(findings: &[ReviewedFinding]) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for f in findings {
            match f.finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    /// Human-readable summary: header counts, one block per finding.
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        if self.findings.is_empty() {
            out.push_str("No high-risk issues detected in this change.\n");
        } else {
            out.push_str(&format!(
                "{} critical, {} warning, {} info\n",
                self.counts.critical, self.counts.warning, self.counts.info
            ));
            for f in &self.findings {
                out.push('\n');
                out.push_str(&format!(
                    "{:?} [{:?}] {}:{}\n  {}\n  evidence: {}\n",
                    f.finding.severity,
                    f.finding.category,
                    f.finding.file_path,
                    f.finding.start_line,
                    f.finding.evidence.reason,
                    f.finding.evidence.snippet,
                ));
                if let Some(explanation) = &f.explanation {
                    out.push_str(&format!("  why: {explanation}\n"));
                }
                if let Some(fix) = &f.suggested_fix {
                    out.push_str(&format!("  fix: {fix}\n"));
                }
            }
        }
        for skipped in &self.skipped_files {
            out.push_str(&format!("skipped {} ({})\n", skipped.path, skipped.reason));
        }
        out
    }
}
