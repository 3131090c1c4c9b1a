//! Structural facts extracted from PHP sources.
//!
//! Conventions:
//! - `serde(rename_all = "snake_case")` on enums to keep serialized forms stable.
//! - Line numbers are 1-based and inclusive.
//! - Qualified names are taken literally from source text; no import resolution.

use serde::{Deserialize, Serialize};

/// Code entity kinds we index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Trait,
    Interface,
    Function,
    Method,
    Constant,
}

/// One extracted code entity with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Repository-relative file path.
    pub file: String,
    pub name: String,
    /// Namespace ⊕ class ⊕ member, `\`/`::`-joined as written in source.
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub start_line: u32,
    pub end_line: u32,
    /// Textual parameter list, parentheses included.
    #[serde(default)]
    pub signature: Option<String>,
    /// Immediately preceding `/** ... */` doc comment, if any.
    #[serde(default)]
    pub docstring: Option<String>,
    /// Qualified name of the containing class-like symbol.
    #[serde(default)]
    pub parent_symbol: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub is_static: bool,
}

impl Symbol {
    /// Concatenated searchable text used by trigram and embedding search.
    pub fn search_text(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(&self.name);
        out.push(' ');
        out.push_str(&self.qualified_name);
        if let Some(sig) = &self.signature {
            out.push(' ');
            out.push_str(sig);
        }
        if let Some(doc) = &self.docstring {
            out.push(' ');
            out.push_str(doc);
        }
        out
    }
}

/// HTTP verbs a route can bind. `Any` matches every verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Any,
}

impl HttpMethod {
    /// Maps a fluent route-call name (`get`, `post`, ...) to a verb.
    pub fn from_call(name: &str) -> Option<Self> {
        Some(match name {
            "get" => Self::Get,
            "post" => Self::Post,
            "put" => Self::Put,
            "patch" => Self::Patch,
            "delete" => Self::Delete,
            "options" => Self::Options,
            "any" => Self::Any,
            _ => return None,
        })
    }
}

/// How the route handler was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    Controller,
    Invokable,
    Closure,
    Unknown,
}

/// One resolved HTTP endpoint after applying all inherited group context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Repository-relative path of the defining file.
    pub source_file: String,
    pub method: HttpMethod,
    /// The uri literal as written at the definition site.
    pub uri: String,
    /// Group prefixes joined with `uri`.
    pub full_uri: String,
    #[serde(default)]
    pub name: Option<String>,
    pub handler_type: HandlerType,
    #[serde(default)]
    pub controller: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Inherited group chain extended by the route's own middleware.
    /// Order preserved, duplicates kept.
    pub middleware: Vec<String>,
    pub start_line: u32,
}

/// Migration-level operation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOp {
    Create,
    Alter,
    Drop,
    Rename,
}

/// Kinds of schema changes that can lose data or break rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestructiveKind {
    DropTable,
    DropColumn,
    RenameTable,
    RenameColumn,
}

/// One destructive schema operation found in a migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestructiveOp {
    pub op: DestructiveKind,
    /// Table or column the operation targets, when extractable.
    #[serde(default)]
    pub target: Option<String>,
    pub line: u32,
}

/// One migration file summarized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    pub file_path: String,
    #[serde(default)]
    pub table_name: Option<String>,
    pub operation: MigrationOp,
    pub is_destructive: bool,
    pub destructive_operations: Vec<DestructiveOp>,
}

/// Parser failure position for one file. Non-fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Everything extracted from a single source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileExtract {
    pub symbols: Vec<Symbol>,
    pub routes: Vec<Route>,
    #[serde(default)]
    pub migration: Option<Migration>,
    pub issues: Vec<ParseIssue>,
}

/// What a path is, as far as extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// Route definition file; resolve routes in addition to symbols.
    Routes,
    /// Database migration; summarize schema operations.
    Migration,
    /// Any other PHP source; symbols only.
    Plain,
}

impl FileRole {
    pub fn of_path(path: &str) -> Self {
        if !path.ends_with(".php") {
            return Self::Plain;
        }
        if path.contains("migrations/") {
            Self::Migration
        } else if path.contains("routes/") {
            Self::Routes
        } else {
            Self::Plain
        }
    }
}

/// Coarse language tag recorded on file metadata.
pub fn language_of_path(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "php" => "php",
        "js" => "javascript",
        "ts" => "typescript",
        "vue" => "vue",
        "blade" => "blade",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "css" => "css",
        "env" => "dotenv",
        _ => "other",
    }
}
