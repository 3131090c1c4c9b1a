//! Trigram similarity used by symbol search.
//!
//! Word-padded 3-grams over lowercased text, scored with Jaccard overlap.
//! Substring containment gets a floor score so exact fragments of long
//! qualified names still surface.

use std::collections::HashSet;

/// Score granted to substring matches that trigram overlap alone would
/// rank lower.
pub(crate) const SUBSTRING_FLOOR: f32 = 0.55;

/// Extracts padded trigrams from every word-like run in `text`.
pub(crate) fn trigrams(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    let mut out = HashSet::new();
    for word in lowered.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if word.is_empty() {
            continue;
        }
        let padded = format!("  {word} ");
        let chars: Vec<char> = padded.chars().collect();
        for w in chars.windows(3) {
            out.insert(w.iter().collect());
        }
    }
    out
}

/// Jaccard similarity of two trigram sets.
pub(crate) fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    if inter == 0 {
        return 0.0;
    }
    let union = a.len() + b.len() - inter;
    inter as f32 / union as f32
}
