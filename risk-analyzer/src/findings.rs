//! Finding model: every detector hit carries verifiable evidence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SecretExposure,
    MigrationDestructive,
    AuthMiddlewareRemoved,
    DependencyChanged,
    EnvLeaked,
    PrivateKeyExposed,
}

/// How the match was identified. Exact token shapes rank above
/// AST/position context, which ranks above heuristic regexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    ExactMatch,
    Structural,
    Pattern,
}

/// Evidence block attached to every finding. Secret material is redacted
/// before it reaches this struct; nothing downstream needs to re-scrub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// The matched line with in-place redaction, ≤ 500 chars.
    pub snippet: String,
    #[serde(default)]
    pub pattern_name: Option<String>,
    /// Redacted match text, when a concrete token was matched.
    #[serde(default)]
    pub matched: Option<String>,
    pub reason: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub category: Category,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub evidence: Evidence,
}
