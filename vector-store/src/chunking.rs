//! Symbol-to-chunk policy.
//!
//! Small symbols are skipped (their names still reach trigram search);
//! mid-size symbols become one chunk; oversized symbols are split into
//! overlapping line windows so neighborhood search stays line-addressable.

use php_indexer::{Symbol, SymbolKind};
use serde::{Deserialize, Serialize};

/// Chunk identity inside one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// One embeddable chunk derived from a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub key: ChunkKey,
    /// Text handed to the embedding model.
    pub text: String,
    pub kind: SymbolKind,
    pub qualified_name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingPolicy {
    /// Symbols spanning fewer lines than this are not embedded.
    pub min_lines: u32,
    /// Window length for oversized symbols.
    pub window_lines: u32,
    /// Overlap between consecutive windows.
    pub overlap_lines: u32,
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            min_lines: 12,
            window_lines: 40,
            overlap_lines: 10,
        }
    }
}

/// Applies the policy to every symbol of one file extract.
pub fn chunk_symbols(symbols: &[Symbol], policy: ChunkingPolicy) -> Vec<Chunk> {
    let mut out = Vec::new();
    for symbol in symbols {
        let span = symbol.end_line.saturating_sub(symbol.start_line) + 1;
        if span < policy.min_lines {
            continue;
        }
        let text = symbol.search_text();
        if span <= policy.window_lines {
            out.push(Chunk {
                key: ChunkKey {
                    file: symbol.file.clone(),
                    start_line: symbol.start_line,
                    end_line: symbol.end_line,
                },
                text,
                kind: symbol.kind,
                qualified_name: symbol.qualified_name.clone(),
            });
            continue;
        }

        let step = policy.window_lines.saturating_sub(policy.overlap_lines).max(1);
        let mut start = symbol.start_line;
        loop {
            let end = (start + policy.window_lines - 1).min(symbol.end_line);
            out.push(Chunk {
                key: ChunkKey {
                    file: symbol.file.clone(),
                    start_line: start,
                    end_line: end,
                },
                text: text.clone(),
                kind: symbol.kind,
                qualified_name: symbol.qualified_name.clone(),
            });
            if end == symbol.end_line {
                break;
            }
            start += step;
        }
    }
    out
}
