//! Tree-sitter plumbing shared by the extractors.
//!
//! Strategy mirrors the rest of the walkers in this workspace: plain DFS
//! over the parse tree, field-based child lookups, no `Query` API. Kind
//! names are matched with aliases where grammar versions drifted.

pub(crate) mod migrations;
pub(crate) mod routes;
pub(crate) mod symbols;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::errors::{Error, Result};

/// Parses PHP source into a tree. The grammar tolerates HTML around
/// `<?php` tags, so blade-ish files degrade instead of failing.
pub(crate) fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let language: Language = tree_sitter_php::LANGUAGE_PHP.into();
    parser.set_language(&language).map_err(|_| Error::Grammar)?;
    parser.parse(source, None).ok_or(Error::Parse)
}

/// Raw text of a node (lossy on invalid UTF-8).
pub(crate) fn text<'a>(n: Node<'_>, src: &'a str) -> &'a str {
    n.utf8_text(src.as_bytes()).unwrap_or_default()
}

/// 1-based line of the node's first byte.
pub(crate) fn start_line(n: Node<'_>) -> u32 {
    n.start_position().row as u32 + 1
}

/// 1-based line of the node's last byte.
pub(crate) fn end_line(n: Node<'_>) -> u32 {
    n.end_position().row as u32 + 1
}

/// Literal value of a quoted string node, quotes stripped.
pub(crate) fn string_value(n: Node<'_>, src: &str) -> Option<String> {
    match n.kind() {
        "string" | "encapsed_string" => {
            let mut cur = n.walk();
            for c in n.named_children(&mut cur) {
                if c.kind() == "string_content" {
                    return Some(text(c, src).to_string());
                }
            }
            // Empty literal or grammar variant without a content node.
            Some(
                text(n, src)
                    .trim_matches(|ch| ch == '\'' || ch == '"')
                    .to_string(),
            )
        }
        _ => None,
    }
}

/// `Foo::class` → `Foo`. Accepts qualified names.
pub(crate) fn class_constant(n: Node<'_>, src: &str) -> Option<String> {
    if n.kind() != "class_constant_access_expression" {
        return None;
    }
    let t = text(n, src);
    t.strip_suffix("::class").map(|c| c.trim().to_string())
}

/// True for every closure-like node kind across grammar versions.
pub(crate) fn is_closure(kind: &str) -> bool {
    matches!(
        kind,
        "anonymous_function" | "anonymous_function_creation_expression" | "arrow_function"
    )
}

/// Positional argument expressions of a call's `arguments` node.
pub(crate) fn call_args<'t>(arguments: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut cur = arguments.walk();
    for child in arguments.named_children(&mut cur) {
        match child.kind() {
            "argument" => {
                let count = child.named_child_count();
                if let Some(expr) = child.named_child(count.saturating_sub(1)) {
                    out.push(expr);
                }
            }
            "comment" => {}
            _ => out.push(child),
        }
    }
    out
}

/// Value expressions of an array literal, keys ignored.
pub(crate) fn array_values<'t>(array: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    if array.kind() != "array_creation_expression" {
        return out;
    }
    let mut cur = array.walk();
    for el in array.named_children(&mut cur) {
        if el.kind() == "array_element_initializer" {
            let count = el.named_child_count();
            if let Some(value) = el.named_child(count.saturating_sub(1)) {
                out.push(value);
            }
        }
    }
    out
}

/// A string argument, or every string inside an array argument.
pub(crate) fn strings_of(n: Node<'_>, src: &str) -> Vec<String> {
    if let Some(s) = string_value(n, src) {
        return vec![s];
    }
    array_values(n)
        .into_iter()
        .filter_map(|v| string_value(v, src))
        .collect()
}

/// Position of the first error/missing node, if the parse was imperfect.
pub(crate) fn first_error(root: Node<'_>) -> Option<(u32, u32, String)> {
    let mut stack = vec![root];
    while let Some(n) = stack.pop() {
        if n.is_error() || n.is_missing() {
            let p = n.start_position();
            let what = if n.is_missing() { "missing" } else { "syntax error" };
            return Some((
                p.row as u32 + 1,
                p.column as u32 + 1,
                format!("{what} near byte {}", n.start_byte()),
            ));
        }
        if n.has_error() {
            let mut cur = n.walk();
            for c in n.children(&mut cur) {
                stack.push(c);
            }
        }
    }
    None
}
