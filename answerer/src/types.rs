//! Answer model: validated sections, unknowns, and the discrete
//! confidence tier.

use serde::Serialize;

/// Discrete confidence label computed from citation counts, never a
/// numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    None,
}

/// One surviving answer section; every index refers to a supplied source.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSection {
    pub text: String,
    pub source_indices: Vec<usize>,
}

/// The validated answer returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub sections: Vec<AnswerSection>,
    pub unknowns: Vec<String>,
    pub confidence_tier: ConfidenceTier,
    pub validation_passed: bool,
    /// Problems found while validating model output; informational
    /// unless no section survived.
    pub validation_errors: Vec<String>,
}

impl Answer {
    /// Flat text rendering: section texts with trailing `[n]` references,
    /// then the unknowns block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            out.push_str(section.text.trim_end());
            if !section.source_indices.is_empty() {
                let refs = section
                    .source_indices
                    .iter()
                    .map(|n| format!("[{n}]"))
                    .collect::<Vec<_>>()
                    .join(", ");
                out.push(' ');
                out.push_str(&refs);
            }
        }
        if !self.unknowns.is_empty() {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str("Could not determine:\n");
            for unknown in &self.unknowns {
                out.push_str("- ");
                out.push_str(unknown);
                out.push('\n');
            }
        }
        out
    }
}

/// Token accounting across every model call of one answer operation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnswerUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Answer plus usage; `model_calls` exposes the retry count to tests and
/// metering.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub answer: Answer,
    pub usage: AnswerUsage,
    pub model_calls: u32,
}
