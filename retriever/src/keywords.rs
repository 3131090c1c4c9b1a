//! Content keyword extraction for the trigram leg.

/// Question scaffolding that carries no content signal.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "this", "that", "with", "from", "into", "about",
    "how", "what", "where", "when", "why", "who", "which", "does", "did", "can", "could",
    "should", "would", "will", "has", "have", "had", "you", "your", "our", "their", "they",
    "there", "here", "not", "all", "any", "its", "it's", "work", "works",
];

/// Maximum keywords fed to the trigram leg.
const MAX_KEYWORDS: usize = 5;

/// Lowercases, tokenizes on word boundaries, drops stopwords and tokens
/// shorter than 3 chars, keeps up to 5 in order of first appearance.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut out: Vec<String> = Vec::new();
    for token in lowered.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if token.len() < 3 || STOPWORDS.contains(&token) {
            continue;
        }
        if out.iter().any(|t| t == token) {
            continue;
        }
        out.push(token.to_string());
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_scaffolding_and_short_tokens() {
        assert_eq!(
            extract_keywords("How does authentication work?"),
            vec!["authentication"]
        );
        assert_eq!(
            extract_keywords("Where is the User model saved to DB?"),
            vec!["user", "model", "saved"]
        );
    }

    #[test]
    fn keeps_at_most_five_unique_tokens() {
        let kws = extract_keywords(
            "payment invoice refund webhook subscription coupon payment invoice",
        );
        assert_eq!(
            kws,
            vec!["payment", "invoice", "refund", "webhook", "subscription"]
        );
    }

    #[test]
    fn empty_query_yields_no_keywords() {
        assert!(extract_keywords("?? !").is_empty());
    }
}
