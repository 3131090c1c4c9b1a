//! Route resolution via context-stack traversal.
//!
//! Group calls push `(prefix, middleware)` frames; routes defined inside a
//! group closure inherit the frame lexically. Inherited state lives only in
//! the frames passed through recursion, never in globals.

use tracing::trace;
use tree_sitter::Node;

use super::{call_args, class_constant, is_closure, start_line, string_value, strings_of, text};
use crate::types::{HandlerType, HttpMethod, Route};

/// Inherited group context. The stack bottom is the empty frame.
#[derive(Debug, Clone, Default)]
struct Frame {
    prefix: String,
    middleware: Vec<String>,
}

/// One link of a fluent call chain rooted at the route facade.
struct Link<'t> {
    name: String,
    args: Vec<Node<'t>>,
    node: Node<'t>,
}

/// The 7-action expansion for `resource(...)`.
const RESOURCE_ACTIONS: &[(&str, HttpMethod, &str)] = &[
    ("index", HttpMethod::Get, ""),
    ("create", HttpMethod::Get, "/create"),
    ("store", HttpMethod::Post, ""),
    ("show", HttpMethod::Get, "/{id}"),
    ("edit", HttpMethod::Get, "/{id}/edit"),
    ("update", HttpMethod::Put, "/{id}"),
    ("destroy", HttpMethod::Delete, "/{id}"),
];

/// `apiResource(...)` drops the two HTML-form actions.
const API_RESOURCE_ACTIONS: &[&str] = &["index", "store", "show", "update", "destroy"];

pub(crate) fn extract_routes(root: Node<'_>, src: &str, file: &str) -> Vec<Route> {
    let mut out = Vec::new();
    let mut frames = vec![Frame::default()];
    walk(root, src, file, &mut frames, &mut out);
    out
}

fn walk(node: Node<'_>, src: &str, file: &str, frames: &mut Vec<Frame>, out: &mut Vec<Route>) {
    let mut cur = node.walk();
    for child in node.named_children(&mut cur) {
        if child.kind() == "expression_statement" {
            if let Some(expr) = child.named_child(0) {
                if let Some(chain) = decompose_chain(expr, src) {
                    handle_chain(&chain, src, file, frames, out);
                    continue;
                }
            }
        }
        walk(child, src, file, frames, out);
    }
}

/// Unrolls `Route::a(...)->b(...)->c(...)` into root-first links. Returns
/// `None` for anything not rooted at the route facade.
fn decompose_chain<'t>(mut node: Node<'t>, src: &str) -> Option<Vec<Link<'t>>> {
    let mut links_rev: Vec<Link<'t>> = Vec::new();
    loop {
        match node.kind() {
            "member_call_expression" => {
                let name = text(node.child_by_field_name("name")?, src).to_string();
                let args = node
                    .child_by_field_name("arguments")
                    .map(call_args)
                    .unwrap_or_default();
                links_rev.push(Link { name, args, node });
                node = node.child_by_field_name("object")?;
            }
            "scoped_call_expression" => {
                let scope = text(node.child_by_field_name("scope")?, src);
                if scope != "Route" && !scope.ends_with("\\Route") {
                    return None;
                }
                let name = text(node.child_by_field_name("name")?, src).to_string();
                let args = node
                    .child_by_field_name("arguments")
                    .map(call_args)
                    .unwrap_or_default();
                links_rev.push(Link { name, args, node });
                links_rev.reverse();
                return Some(links_rev);
            }
            _ => return None,
        }
    }
}

fn handle_chain(
    chain: &[Link<'_>],
    src: &str,
    file: &str,
    frames: &mut Vec<Frame>,
    out: &mut Vec<Route>,
) {
    // Group chains terminate in `group(<closure>)`.
    if let Some(group) = chain.iter().find(|l| l.name == "group") {
        let Some(closure) = group.args.iter().find(|a| is_closure(a.kind())) else {
            return;
        };
        let parent = frames.last().cloned().unwrap_or_default();

        let prefix_arg = chain
            .iter()
            .filter(|l| l.name == "prefix")
            .find_map(|l| l.args.first().and_then(|a| string_value(*a, src)))
            .unwrap_or_default();

        let mut middleware = parent.middleware.clone();
        for link in chain.iter().filter(|l| l.name == "middleware") {
            for arg in &link.args {
                middleware.extend(strings_of(*arg, src));
            }
        }

        frames.push(Frame {
            prefix: join_prefix(&parent.prefix, &prefix_arg),
            middleware,
        });
        trace!(file, frame = ?frames.last(), "entering route group");
        if let Some(body) = closure.child_by_field_name("body") {
            walk(body, src, file, frames, out);
        }
        frames.pop();
        return;
    }

    let frame = frames.last().cloned().unwrap_or_default();

    // Plain endpoint: the chain contains one HTTP-verb call.
    if let Some((link, method)) = chain
        .iter()
        .find_map(|l| HttpMethod::from_call(&l.name).map(|m| (l, m)))
    {
        let Some(uri) = link.args.first().and_then(|a| string_value(*a, src)) else {
            return;
        };
        let (handler_type, controller, action) = match link.args.get(1) {
            Some(h) => parse_handler(*h, src),
            None => (HandlerType::Unknown, None, None),
        };

        let name = chain
            .iter()
            .filter(|l| l.name == "name")
            .find_map(|l| l.args.first().and_then(|a| string_value(*a, src)));

        let mut middleware = frame.middleware.clone();
        for l in chain.iter().filter(|l| l.name == "middleware") {
            for arg in &l.args {
                middleware.extend(strings_of(*arg, src));
            }
        }

        out.push(Route {
            source_file: file.to_string(),
            method,
            full_uri: join_prefix(&frame.prefix, &uri),
            uri,
            name,
            handler_type,
            controller,
            action,
            middleware,
            start_line: start_line(link.node),
        });
        return;
    }

    // Resource shorthand expands into a fixed action set.
    if let Some(link) = chain
        .iter()
        .find(|l| l.name == "resource" || l.name == "apiResource")
    {
        let Some(resource) = link.args.first().and_then(|a| string_value(*a, src)) else {
            return;
        };
        let controller = link
            .args
            .get(1)
            .and_then(|a| class_constant(*a, src).or_else(|| string_value(*a, src)));

        let mut middleware = frame.middleware.clone();
        for l in chain.iter().filter(|l| l.name == "middleware") {
            for arg in &l.args {
                middleware.extend(strings_of(*arg, src));
            }
        }

        for (action, method, suffix) in RESOURCE_ACTIONS {
            if link.name == "apiResource" && !API_RESOURCE_ACTIONS.contains(action) {
                continue;
            }
            let uri = format!("/{resource}{suffix}");
            out.push(Route {
                source_file: file.to_string(),
                method: *method,
                full_uri: join_prefix(&frame.prefix, &uri),
                uri,
                name: Some(format!("{resource}.{action}")),
                handler_type: HandlerType::Controller,
                controller: controller.clone(),
                action: Some((*action).to_string()),
                middleware: middleware.clone(),
                start_line: start_line(link.node),
            });
        }
    }
}

/// Handler shapes: `[Class::class, 'method']` → controller+action,
/// bare `Class::class` → invokable, closure → closure, rest → unknown.
fn parse_handler(
    node: Node<'_>,
    src: &str,
) -> (HandlerType, Option<String>, Option<String>) {
    if is_closure(node.kind()) {
        return (HandlerType::Closure, None, None);
    }
    if let Some(class) = class_constant(node, src) {
        return (
            HandlerType::Invokable,
            Some(class),
            Some("__invoke".to_string()),
        );
    }
    if node.kind() == "array_creation_expression" {
        let values = super::array_values(node);
        if values.len() == 2 {
            if let (Some(class), Some(action)) = (
                class_constant(values[0], src),
                string_value(values[1], src),
            ) {
                return (HandlerType::Controller, Some(class), Some(action));
            }
        }
    }
    (HandlerType::Unknown, None, None)
}

/// Prefix composition: trim `/` from both sides, then rejoin under a
/// single leading slash. Both empty yields the bare root.
fn join_prefix(parent: &str, child: &str) -> String {
    let p = parent.trim_matches('/');
    let c = child.trim_matches('/');
    match (p.is_empty(), c.is_empty()) {
        (false, false) => format!("/{p}/{c}"),
        (false, true) => format!("/{p}"),
        (true, false) => format!("/{c}"),
        (true, true) => "/".to_string(),
    }
}
