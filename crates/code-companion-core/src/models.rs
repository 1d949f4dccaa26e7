//! Core data models shared by the indexing and query paths.

use serde::{Deserialize, Serialize};

/// One extracted function or method plus its provenance.
///
/// Line numbers are 1-based and inclusive. A value of `0` means "unknown";
/// the encoder omits the line-range header when both are `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub file_path: String,
    pub language: String,
    /// Declared name; empty for anonymous functions.
    pub function_name: String,
    /// Exact source bytes of the declaration, never reformatted.
    pub code: String,
    pub start_line: usize,
    pub end_line: usize,
    /// Leading documentation comment with markers stripped, trimmed.
    pub doc_string: String,
}

impl Snippet {
    /// Builds the deterministic id for a snippet starting at `start_line`
    /// of `file_path`. Re-indexing the same file yields the same ids.
    pub fn make_id(file_path: &str, start_line: usize) -> String {
        format!("{}:{}", file_path, start_line)
    }
}

/// A retrieved document and its relevance distance (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub distance: f64,
}

impl SearchResult {
    pub fn new(text: impl Into<String>, distance: f64) -> Self {
        Self {
            text: text.into(),
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_distinguishes_start_lines() {
        let a = Snippet::make_id("pkg/scene.go", 3);
        let b = Snippet::make_id("pkg/scene.go", 10);
        assert_eq!(a, "pkg/scene.go:3");
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_is_stable() {
        assert_eq!(
            Snippet::make_id("/abs/main.go", 42),
            Snippet::make_id("/abs/main.go", 42)
        );
    }
}
