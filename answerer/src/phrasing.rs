//! Short phrasing pass for review findings: one explanation and one
//! suggested fix, both bounded, both optional enrichment.

use serde::Deserialize;

use crate::types::AnswerUsage;

/// What the reviewer hands over for phrasing. Snippets arrive already
/// redacted.
#[derive(Debug, Clone)]
pub struct PhrasingInput<'a> {
    pub category: &'a str,
    pub file: &'a str,
    pub line: u32,
    pub reason: &'a str,
    pub snippet: &'a str,
}

/// Model-phrased explanation for one finding.
#[derive(Debug, Clone, Deserialize)]
pub struct Phrasing {
    pub explanation: String,
    pub suggested_fix: String,
}

/// Phrasing plus the tokens it cost; `phrasing` is `None` when the model
/// output could not be parsed (the finding stands on its own evidence).
#[derive(Debug)]
pub struct PhraseOutcome {
    pub phrasing: Option<Phrasing>,
    pub usage: AnswerUsage,
}

pub(crate) fn build_phrasing_prompt(input: &PhrasingInput<'_>) -> String {
    format!(
        "A code review detector flagged this change.\n\
         Category: {}\nFile: {}:{}\nReason: {}\nEvidence line:\n```\n{}\n```\n\n\
         Output only a JSON value: {{ \"explanation\": string, \"suggested_fix\": string }}.\n\
         Keep each value to at most two sentences.",
        input.category, input.file, input.line, input.reason, input.snippet,
    )
}
