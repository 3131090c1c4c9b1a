//! Retrieval output model. Source indices are the 1-based numbers the
//! answer layer cites; their stability is part of the contract.

use serde::Serialize;

/// Which leg produced a merged candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Trigram,
    Vector,
    Both,
}

/// One numbered, hydrated evidence passage.
#[derive(Debug, Clone, Serialize)]
pub struct SourceUnit {
    /// 1-based index used in prompts and citations.
    pub source_index: usize,
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Literal source text, or a fetch placeholder.
    pub content: String,
    #[serde(default)]
    pub symbol_name: Option<String>,
    /// Normalized to `0.0..=1.0`; max of the contributing legs.
    pub score: f32,
    pub source_type: SourceOrigin,
}

/// Full retrieval result plus the token count charged for the query
/// embedding.
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub sources: Vec<SourceUnit>,
    pub embedding_tokens: u64,
}
