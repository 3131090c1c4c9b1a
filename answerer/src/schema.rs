//! The model's output contract and its lenient-but-strict parsing.
//!
//! The model is an untrusted producer: parsing recovers what it can
//! (brace extraction around prose), validation drops what it must
//! (unknown ids, empty sections), and the caller decides whether enough
//! survived.

use serde::Deserialize;

/// Raw payload shape the model must emit.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelPayload {
    pub sections: Vec<ModelSection>,
    #[serde(default)]
    pub unknowns: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelSection {
    pub text: String,
    #[serde(default)]
    pub source_ids: Vec<i64>,
}

/// Parses model text as JSON; falls back to the first balanced-brace
/// region when the model wrapped the value in prose.
pub(crate) fn parse_payload(text: &str) -> Result<ModelPayload, String> {
    match serde_json::from_str::<ModelPayload>(text) {
        Ok(payload) => Ok(payload),
        Err(first_err) => {
            let Some(region) = balanced_braces(text) else {
                return Err(format!("no JSON object found: {first_err}"));
            };
            serde_json::from_str::<ModelPayload>(region)
                .map_err(|e| format!("stripped JSON still invalid: {e}"))
        }
    }
}

/// First `{ ... }` region with balanced braces, string-aware.
fn balanced_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let payload = parse_payload(
            r#"{"sections": [{"text": "Auth runs in middleware.", "source_ids": [1, 2]}], "unknowns": []}"#,
        )
        .unwrap();
        assert_eq!(payload.sections.len(), 1);
        assert_eq!(payload.sections[0].source_ids, vec![1, 2]);
    }

    #[test]
    fn strips_surrounding_prose() {
        let text = "Sure! Here is the answer:\n{\"sections\": [{\"text\": \"ok\", \"source_ids\": [1]}], \"unknowns\": []}\nHope this helps.";
        let payload = parse_payload(text).unwrap();
        assert_eq!(payload.sections[0].text, "ok");
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_extraction() {
        let text = "note {\"sections\": [{\"text\": \"uses {closure} handlers\", \"source_ids\": [1]}], \"unknowns\": []} end";
        let payload = parse_payload(text).unwrap();
        assert!(payload.sections[0].text.contains("{closure}"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_payload("I cannot answer that.").is_err());
        assert!(parse_payload("{\"sections\": ").is_err());
    }
}
