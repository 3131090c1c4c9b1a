//! Prompt assembly: numbered sources, the question, and the strict
//! output-schema instruction.

use retriever::SourceUnit;

/// Appended on the retry after a malformed response.
pub(crate) const RETRY_REMINDER: &str =
    "\n\nReminder: output only the JSON value described above, with no prose before or after it.";

pub(crate) fn build_answer_prompt(question: &str, sources: &[SourceUnit]) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(
        "You are a precise code assistant. Answer strictly from the numbered sources below; \
         never invent file locations.\n\n",
    );

    for source in sources {
        let symbol = source
            .symbol_name
            .as_deref()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "[Source {}] {}:{}-{}{}\n```\n{}\n```\n\n",
            source.source_index,
            source.file,
            source.start_line,
            source.end_line,
            symbol,
            source.content.trim_end(),
        ));
    }

    out.push_str("Question:\n");
    out.push_str(question.trim());
    out.push_str("\n\n");

    out.push_str(
        "Output only a JSON value of this exact shape:\n\
         { \"sections\": [ { \"text\": string, \"source_ids\": [int, ...] }, ... ],\n  \
         \"unknowns\": [ string, ... ] }\n\
         Every section must cite at least one source id from the list above. \
         Anything the sources do not establish goes into \"unknowns\".",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use retriever::SourceOrigin;

    #[test]
    fn prompt_numbers_sources_and_includes_schema() {
        let sources = vec![SourceUnit {
            source_index: 1,
            file: "app/Http/Kernel.php".to_string(),
            start_line: 40,
            end_line: 55,
            content: "protected $middlewareGroups = [".to_string(),
            symbol_name: Some("App\\Http\\Kernel".to_string()),
            score: 0.9,
            source_type: SourceOrigin::Both,
        }];
        let prompt = build_answer_prompt("How does auth work?", &sources);
        assert!(prompt.contains("[Source 1] app/Http/Kernel.php:40-55 (App\\Http\\Kernel)"));
        assert!(prompt.contains("\"sections\""));
        assert!(prompt.contains("Question:\nHow does auth work?"));
    }
}
