//! Symbol extraction: classes, interfaces, traits, functions, methods,
//! constants. Qualified names are literal source text; imports are not
//! resolved.

use tree_sitter::Node;

use super::{end_line, start_line, text};
use crate::types::{Symbol, SymbolKind};

pub(crate) fn extract_symbols(root: Node<'_>, src: &str, file: &str) -> Vec<Symbol> {
    let mut out = Vec::new();
    walk_scope(root, src, file, None, &mut out);
    out
}

/// Walks a top-level or namespace-body scope. Function/method bodies are
/// not descended into; nested declarations there are not indexed.
fn walk_scope(scope: Node<'_>, src: &str, file: &str, ns: Option<&str>, out: &mut Vec<Symbol>) {
    let mut namespace: Option<String> = ns.map(str::to_string);
    let mut cur = scope.walk();
    for node in scope.named_children(&mut cur) {
        match node.kind() {
            "namespace_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| text(n, src).to_string());
                match node.child_by_field_name("body") {
                    // `namespace Foo { ... }` brace form scopes its body only.
                    Some(body) => walk_scope(body, src, file, name.as_deref(), out),
                    // Statement form applies to the rest of the file.
                    None => namespace = name,
                }
            }
            "class_declaration" => {
                emit_class_like(node, src, file, namespace.as_deref(), SymbolKind::Class, out)
            }
            "interface_declaration" => emit_class_like(
                node,
                src,
                file,
                namespace.as_deref(),
                SymbolKind::Interface,
                out,
            ),
            "trait_declaration" => {
                emit_class_like(node, src, file, namespace.as_deref(), SymbolKind::Trait, out)
            }
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = text(name_node, src).to_string();
                    out.push(Symbol {
                        file: file.to_string(),
                        qualified_name: qualify(namespace.as_deref(), &name),
                        name,
                        kind: SymbolKind::Function,
                        start_line: start_line(node),
                        end_line: end_line(node),
                        signature: node
                            .child_by_field_name("parameters")
                            .map(|p| text(p, src).to_string()),
                        docstring: doc_of(node, src),
                        parent_symbol: None,
                        visibility: None,
                        is_static: false,
                    });
                }
            }
            "const_declaration" => {
                emit_constants(node, src, file, namespace.as_deref(), None, out)
            }
            _ => {}
        }
    }
}

fn emit_class_like(
    node: Node<'_>,
    src: &str,
    file: &str,
    ns: Option<&str>,
    kind: SymbolKind,
    out: &mut Vec<Symbol>,
) {
    let Some(name_node) = node.child_by_field_name("name") else {
        return;
    };
    let name = text(name_node, src).to_string();
    let qualified = qualify(ns, &name);

    out.push(Symbol {
        file: file.to_string(),
        name: name.clone(),
        qualified_name: qualified.clone(),
        kind,
        start_line: start_line(node),
        end_line: end_line(node),
        signature: None,
        docstring: doc_of(node, src),
        parent_symbol: None,
        visibility: None,
        is_static: false,
    });

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cur = body.walk();
    for member in body.named_children(&mut cur) {
        match member.kind() {
            "method_declaration" => {
                if let Some(mname_node) = member.child_by_field_name("name") {
                    let mname = text(mname_node, src).to_string();
                    out.push(Symbol {
                        file: file.to_string(),
                        qualified_name: format!("{qualified}::{mname}"),
                        name: mname,
                        kind: SymbolKind::Method,
                        start_line: start_line(member),
                        end_line: end_line(member),
                        signature: member
                            .child_by_field_name("parameters")
                            .map(|p| text(p, src).to_string()),
                        docstring: doc_of(member, src),
                        parent_symbol: Some(qualified.clone()),
                        visibility: visibility_of(member, src),
                        is_static: has_modifier(member, "static_modifier"),
                    });
                }
            }
            "const_declaration" => {
                emit_constants(member, src, file, ns, Some(&qualified), out)
            }
            _ => {}
        }
    }
}

/// One symbol per `const_element`; shared modifiers come from the
/// declaration node.
fn emit_constants(
    decl: Node<'_>,
    src: &str,
    file: &str,
    ns: Option<&str>,
    parent: Option<&str>,
    out: &mut Vec<Symbol>,
) {
    let doc = doc_of(decl, src);
    let visibility = visibility_of(decl, src);
    let mut cur = decl.walk();
    for el in decl.named_children(&mut cur) {
        if el.kind() != "const_element" {
            continue;
        }
        let Some(name_node) = el.named_child(0) else {
            continue;
        };
        let name = text(name_node, src).to_string();
        let qualified_name = match parent {
            Some(p) => format!("{p}::{name}"),
            None => qualify(ns, &name),
        };
        out.push(Symbol {
            file: file.to_string(),
            name,
            qualified_name,
            kind: SymbolKind::Constant,
            start_line: start_line(el),
            end_line: end_line(el),
            signature: None,
            docstring: doc.clone(),
            parent_symbol: parent.map(str::to_string),
            visibility: visibility.clone(),
            is_static: false,
        });
    }
}

fn qualify(ns: Option<&str>, name: &str) -> String {
    match ns {
        Some(ns) if !ns.is_empty() => format!("{ns}\\{name}"),
        _ => name.to_string(),
    }
}

/// The `/** ... */` block immediately preceding a declaration.
fn doc_of(node: Node<'_>, src: &str) -> Option<String> {
    let prev = node.prev_named_sibling()?;
    if prev.kind() != "comment" {
        return None;
    }
    let t = text(prev, src);
    if t.starts_with("/**") {
        Some(t.to_string())
    } else {
        None
    }
}

fn visibility_of(node: Node<'_>, src: &str) -> Option<String> {
    let mut cur = node.walk();
    for c in node.children(&mut cur) {
        if c.kind() == "visibility_modifier" {
            return Some(text(c, src).to_string());
        }
    }
    None
}

fn has_modifier(node: Node<'_>, kind: &str) -> bool {
    let mut cur = node.walk();
    node.children(&mut cur).any(|c| c.kind() == kind)
}
