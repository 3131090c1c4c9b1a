//! Unified-diff parsing for added-line scoping.
//!
//! Tolerant of hunks-only input (no `---`/`+++` headers) and of
//! `\ No newline at end of file` markers. Binary patches are detected
//! heuristically and yield no line data.

use std::collections::HashSet;

/// One `@@` hunk with the added lines it contributes to the new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// `(new_file_line, content)` for every `+` line.
    pub added: Vec<(u32, String)>,
}

/// Parses a unified diff; only `@@` headers are required.
pub fn parse_patch(patch: &str) -> Vec<Hunk> {
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut current: Option<Hunk> = None;
    let mut old_line = 0u32;
    let mut new_line = 0u32;

    for line in patch.lines() {
        if line.starts_with("@@") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            let Some((old_start, old_lines, new_start, new_lines)) = parse_hunk_header(line)
            else {
                continue;
            };
            old_line = old_start;
            new_line = new_start;
            current = Some(Hunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                added: Vec::new(),
            });
            continue;
        }

        // "\ No newline at end of file" is metadata, not content.
        if line.starts_with('\\') {
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            // Prelude before the first hunk (file headers, mode lines).
            continue;
        };

        if let Some(rest) = line.strip_prefix('+') {
            hunk.added.push((new_line, rest.to_string()));
            new_line += 1;
        } else if line.starts_with('-') {
            old_line += 1;
        } else {
            // Context, including the odd malformed line.
            old_line += 1;
            new_line += 1;
        }
    }
    if let Some(h) = current.take() {
        hunks.push(h);
    }
    hunks
}

/// `@@ -a,b +c,d @@ ...` → `(a, b, c, d)`; omitted counts default to 1.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let inner = line.trim_start_matches('@').trim_end();
    let inner = match inner.find("@@") {
        Some(pos) => &inner[..pos],
        None => inner,
    };
    let mut parts = inner.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    let (old_start, old_lines) = split_counts(old);
    let (new_start, new_lines) = split_counts(new);
    Some((old_start, old_lines, new_start, new_lines))
}

fn split_counts(s: &str) -> (u32, u32) {
    match s.split_once(',') {
        Some((a, b)) => (a.parse().unwrap_or(0), b.parse().unwrap_or(0)),
        None => (s.parse().unwrap_or(0), 1),
    }
}

/// Set of new-file line numbers added by the patch.
pub fn added_lines(patch: &str) -> HashSet<u32> {
    parse_patch(patch)
        .into_iter()
        .flat_map(|h| h.added.into_iter().map(|(line, _)| line))
        .collect()
}

/// Binary patches carry no reviewable lines.
pub fn looks_like_binary_patch(patch: &str) -> bool {
    patch.contains("GIT binary patch")
        || patch.starts_with("Binary files ")
        || (patch.starts_with("Files ") && patch.contains(" differ"))
}
