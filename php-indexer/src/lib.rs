//! Structural extraction for Laravel-style PHP repositories.
//!
//! One entrypoint, [`extract_file`], turns source bytes into symbols,
//! resolved routes (for route files), and a migration summary (for
//! migration files). Parsing is CPU-bound; async callers should wrap
//! calls in `spawn_blocking`.

mod ast;
pub mod errors;
pub mod types;

pub use errors::{Error, Result};
pub use types::{
    DestructiveKind, DestructiveOp, FileExtract, FileRole, HandlerType, HttpMethod, Migration,
    MigrationOp, ParseIssue, Route, Symbol, SymbolKind, language_of_path,
};

use tracing::debug;

/// Parses one file and extracts every structural fact its path role calls
/// for.
///
/// Failure handling: an imperfect parse records a [`ParseIssue`] and
/// suppresses route emission for the file (partially resolved groups are
/// worse than none); symbol extraction continues over the valid subtrees.
pub fn extract_file(path: &str, source: &str) -> Result<FileExtract> {
    let tree = ast::parse(source)?;
    let root = tree.root_node();

    let mut issues = Vec::new();
    if root.has_error() {
        if let Some((line, column, message)) = ast::first_error(root) {
            debug!(path, line, column, "parse error recorded");
            issues.push(ParseIssue {
                file: path.to_string(),
                line,
                column,
                message,
            });
        }
    }

    let symbols = ast::symbols::extract_symbols(root, source, path);

    let role = FileRole::of_path(path);
    let routes = if role == FileRole::Routes && issues.is_empty() {
        ast::routes::extract_routes(root, source, path)
    } else {
        Vec::new()
    };

    let migration = (role == FileRole::Migration)
        .then(|| ast::migrations::extract_migration(root, source, path));

    debug!(
        path,
        symbols = symbols.len(),
        routes = routes.len(),
        has_migration = migration.is_some(),
        "file extracted"
    );

    Ok(FileExtract {
        symbols,
        routes,
        migration,
        issues,
    })
}
