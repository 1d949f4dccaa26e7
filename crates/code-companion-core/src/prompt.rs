//! Retrieval-augmented prompt assembly.
//!
//! [`build_prompt`] turns a question plus ranked search results into the user
//! prompt for the generation call. It is a pure function: the same inputs
//! always produce the same text, and results are emitted in the order given
//! (the store has already ranked them).
//!
//! # Layout
//!
//! ```text
//! <preamble>
//!
//! --- Example 1 ---
//! File: internal/scene/loader.go
//! Function: LoadScene
//! Lines: 10-15
//! <decoded body>
//!
//! --- Example 2 ---
//! ...
//!
//! Question:
//! <question>
//!
//! <closing instructions>
//! ```
//!
//! With no results the question is returned unchanged so the model is not
//! handed an empty context section.

use crate::codec::decode;
use crate::models::SearchResult;

/// System prompt recommended for the generation call.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a coding assistant that answers questions \
about the user's own codebase. Prefer the patterns and conventions shown in the provided \
examples.";

const PREAMBLE: &str = "The following examples come from the user's own codebase. \
Use them to inform the style and structure of your answer, but do not copy them verbatim.";

const CLOSING: &str = "When answering:\n\
1. Identify which example(s) informed your answer.\n\
2. Adapt the patterns to the question instead of copying code.\n\
3. Keep naming and error-handling conventions consistent with the examples.\n\
4. Return a complete, runnable example.";

/// Build the user prompt for `question` from retrieved `results`.
pub fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return question.to_string();
    }

    let mut prompt = String::new();
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    for (i, result) in results.iter().enumerate() {
        push_example(&mut prompt, i + 1, result);
    }

    prompt.push_str("Question:\n");
    prompt.push_str(question);
    prompt.push_str("\n\n");
    prompt.push_str(CLOSING);
    prompt.push('\n');
    prompt
}

fn push_example(prompt: &mut String, number: usize, result: &SearchResult) {
    let decoded = decode(&result.text);

    prompt.push_str(&format!("--- Example {} ---\n", number));
    if !decoded.file_path.is_empty() {
        prompt.push_str(&format!("File: {}\n", decoded.file_path));
    }
    if !decoded.function_name.is_empty() {
        prompt.push_str(&format!("Function: {}\n", decoded.function_name));
    }
    if decoded.has_line_range() {
        prompt.push_str(&format!(
            "Lines: {}-{}\n",
            decoded.start_line, decoded.end_line
        ));
    }

    // decode() already returns the whole text as body when no header was
    // recovered, so nothing is ever dropped here.
    prompt.push_str(&decoded.body);
    if !decoded.body.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::models::Snippet;

    fn encoded(name: &str, start: usize, end: usize, code: &str) -> String {
        encode(&Snippet {
            id: Snippet::make_id("scene.go", start),
            file_path: "scene.go".to_string(),
            language: "go".to_string(),
            function_name: name.to_string(),
            code: code.to_string(),
            start_line: start,
            end_line: end,
            doc_string: String::new(),
        })
    }

    #[test]
    fn test_empty_results_returns_question() {
        assert_eq!(build_prompt("explain X", &[]), "explain X");
    }

    #[test]
    fn test_sections_follow_result_order() {
        let results = vec![
            SearchResult::new(encoded("Second", 20, 22, "func Second() {}"), 0.1),
            SearchResult::new(encoded("First", 3, 7, "func First() {}"), 0.4),
        ];
        let prompt = build_prompt("how are scenes loaded?", &results);

        let first = prompt.find("--- Example 1 ---").unwrap();
        let second = prompt.find("--- Example 2 ---").unwrap();
        assert!(first < second);
        assert!(prompt[first..second].contains("Function: Second"));
        assert!(prompt[second..].contains("Function: First"));
        assert!(prompt.contains("Lines: 20-22\nfunc Second() {}\n"));
        assert!(!prompt.contains("--- Example 3 ---"));
    }

    #[test]
    fn test_question_appears_once_after_examples() {
        let results = vec![SearchResult::new(encoded("A", 1, 2, "func A() {}"), 0.2)];
        let question = "how do I set up a scene?";
        let prompt = build_prompt(question, &results);

        assert_eq!(prompt.matches(question).count(), 1);
        assert!(prompt.find(question).unwrap() > prompt.find("--- Example 1 ---").unwrap());
        assert!(prompt.starts_with(PREAMBLE));
        assert!(prompt.trim_end().ends_with("Return a complete, runnable example."));
    }

    #[test]
    fn test_headerless_result_keeps_full_text() {
        let raw = "func legacy() {\n\treturn\n}";
        let prompt = build_prompt("q?", &[SearchResult::new(raw, 0.5)]);
        assert!(prompt.contains("--- Example 1 ---\nfunc legacy() {\n\treturn\n}\n"));
        assert!(!prompt.contains("File:"));
        assert!(!prompt.contains("Function:"));
    }

    #[test]
    fn test_deterministic() {
        let results = vec![SearchResult::new(encoded("A", 1, 2, "func A() {}"), 0.2)];
        assert_eq!(build_prompt("q", &results), build_prompt("q", &results));
    }
}
