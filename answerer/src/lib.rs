//! Constrained answer generation.
//!
//! The language model only phrases: it receives numbered sources and must
//! emit a JSON value whose every section cites valid source ids. Failed
//! validation degrades to a typed "insufficient evidence" answer; it
//! never raises.

mod phrasing;
mod prompt;
mod schema;
pub mod types;

pub use phrasing::{PhraseOutcome, Phrasing, PhrasingInput};
pub use types::{Answer, AnswerOutcome, AnswerSection, AnswerUsage, ConfidenceTier};

use std::collections::BTreeSet;
use std::sync::Arc;

use llm_service::{LanguageModel, LlmError};
use retriever::SourceUnit;
use services::{CancelToken, Cancelled};
use thiserror::Error;
use tracing::{debug, warn};

use prompt::{RETRY_REMINDER, build_answer_prompt};
use schema::{ModelPayload, parse_payload};

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("model call failed: {0}")]
    Model(#[from] LlmError),
}

pub type Result<T> = std::result::Result<T, AnswerError>;

#[derive(Debug, Clone)]
pub struct AnswererConfig {
    pub max_tokens: u32,
    /// Full-call retries after a malformed response.
    pub retry_on_parse_failure: u32,
}

impl Default for AnswererConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1500,
            retry_on_parse_failure: 1,
        }
    }
}

pub struct Answerer {
    model: Arc<dyn LanguageModel>,
    cfg: AnswererConfig,
}

impl Answerer {
    pub fn new(model: Arc<dyn LanguageModel>, cfg: AnswererConfig) -> Self {
        Self { model, cfg }
    }

    /// Answers `question` from `sources`. With no sources the model is
    /// never called and the result is the fixed insufficient-evidence
    /// answer echoing the question.
    pub async fn answer(
        &self,
        question: &str,
        sources: &[SourceUnit],
        cancel: &CancelToken,
    ) -> Result<AnswerOutcome> {
        if sources.is_empty() {
            debug!("zero evidence; skipping model call");
            return Ok(AnswerOutcome {
                answer: Answer {
                    sections: Vec::new(),
                    unknowns: vec![question.to_string()],
                    confidence_tier: ConfidenceTier::None,
                    validation_passed: true,
                    validation_errors: Vec::new(),
                },
                usage: AnswerUsage::default(),
                model_calls: 0,
            });
        }

        let base_prompt = build_answer_prompt(question, sources);
        let mut usage = AnswerUsage::default();
        let mut model_calls = 0u32;
        let mut parse_errors: Vec<String> = Vec::new();

        for attempt in 0..=self.cfg.retry_on_parse_failure {
            let prompt = if attempt == 0 {
                base_prompt.clone()
            } else {
                format!("{base_prompt}{RETRY_REMINDER}")
            };

            let generation = tokio::select! {
                _ = cancel.cancelled() => return Err(Cancelled.into()),
                out = self.model.generate(&prompt, self.cfg.max_tokens) => out?,
            };
            model_calls += 1;
            usage.input_tokens += generation.input_tokens;
            usage.output_tokens += generation.output_tokens;

            match parse_payload(&generation.text) {
                Ok(payload) => {
                    let answer = validate(payload, sources, question, parse_errors);
                    return Ok(AnswerOutcome {
                        answer,
                        usage,
                        model_calls,
                    });
                }
                Err(err) => {
                    warn!(attempt, %err, "model output failed schema parse");
                    parse_errors.push(err);
                }
            }
        }

        Ok(AnswerOutcome {
            answer: Answer {
                sections: Vec::new(),
                unknowns: vec![question.to_string()],
                confidence_tier: ConfidenceTier::None,
                validation_passed: false,
                validation_errors: parse_errors,
            },
            usage,
            model_calls,
        })
    }

    /// Phrases one review finding. Parse failures yield `Ok` with no
    /// phrasing; the finding's own evidence already stands.
    pub async fn phrase_finding(
        &self,
        input: &PhrasingInput<'_>,
        cancel: &CancelToken,
    ) -> Result<PhraseOutcome> {
        let prompt = phrasing::build_phrasing_prompt(input);
        let generation = tokio::select! {
            _ = cancel.cancelled() => return Err(Cancelled.into()),
            out = self.model.generate(&prompt, 220) => out?,
        };
        let usage = AnswerUsage {
            input_tokens: generation.input_tokens,
            output_tokens: generation.output_tokens,
        };

        let phrasing = serde_json::from_str::<Phrasing>(&generation.text)
            .ok()
            .or_else(|| {
                let start = generation.text.find('{')?;
                let end = generation.text.rfind('}')?;
                serde_json::from_str(&generation.text[start..=end]).ok()
            });
        Ok(PhraseOutcome { phrasing, usage })
    }
}

/// Drops invalid ids and empty sections, computes the tier from what
/// survived.
fn validate(
    payload: ModelPayload,
    sources: &[SourceUnit],
    question: &str,
    mut errors: Vec<String>,
) -> Answer {
    let valid_ids: BTreeSet<usize> = sources.iter().map(|s| s.source_index).collect();
    let mut sections = Vec::new();

    for (i, section) in payload.sections.into_iter().enumerate() {
        let text = section.text.trim().to_string();
        if text.is_empty() {
            errors.push(format!("section {} has empty text", i + 1));
            continue;
        }

        let mut kept: Vec<usize> = Vec::new();
        for id in section.source_ids {
            let ok = usize::try_from(id)
                .ok()
                .filter(|id| valid_ids.contains(id));
            match ok {
                Some(id) if !kept.contains(&id) => kept.push(id),
                Some(_) => {}
                None => errors.push(format!("section {} cites unknown source {}", i + 1, id)),
            }
        }
        if kept.is_empty() {
            errors.push(format!("section {} has no valid citations", i + 1));
            continue;
        }
        sections.push(AnswerSection {
            text,
            source_indices: kept,
        });
    }

    let cited: BTreeSet<usize> = sections
        .iter()
        .flat_map(|s| s.source_indices.iter().copied())
        .collect();
    let files: BTreeSet<&str> = sources
        .iter()
        .filter(|s| cited.contains(&s.source_index))
        .map(|s| s.file.as_str())
        .collect();

    let confidence_tier = match (cited.len(), files.len()) {
        (0, _) => ConfidenceTier::None,
        (c, f) if c >= 3 && f >= 2 => ConfidenceTier::High,
        (c, _) if c >= 2 => ConfidenceTier::Medium,
        _ => ConfidenceTier::Low,
    };

    let mut unknowns = payload.unknowns;
    if sections.is_empty() && unknowns.is_empty() {
        unknowns.push(question.to_string());
    }

    Answer {
        validation_passed: errors.is_empty() && !sections.is_empty(),
        confidence_tier,
        sections,
        unknowns,
        validation_errors: errors,
    }
}
