//! Self-describing snippet encoding.
//!
//! The vector store only reliably returns the stored text, so every snippet
//! carries its own metadata as a small header block in front of the code.
//!
//! # Format
//!
//! ```text
//! // file: internal/scene/loader.go
//! // function: LoadScene
//! // lines: 10-15
//! /* doc: LoadScene reads a scene definition from disk. */
//! func LoadScene(path string) (*Scene, error) {
//!     ...
//! }
//! ```
//!
//! Header lines appear in that fixed order, one field per line. Only the file
//! line is mandatory; the others are omitted when the field is empty. The code
//! follows the last header line byte-for-byte.
//!
//! # Decoding
//!
//! [`decode`] consumes header lines from the top and stops at the first line
//! that is not a well-formed header. That line and everything after it is the
//! body, returned as an exact slice of the input. A line with a known prefix
//! but an unusable value (say `// lines: ten-fifteen`) stops the scan and is
//! kept in the body.
//!
//! The boundary rule means a body whose first line is itself a valid header
//! line gets misread as metadata. Every marker lives in the `// ` comment
//! space, and new field markers must go there too so older decoders stop
//! cleanly at them.
//!
//! # Example
//!
//! ```rust
//! use code_companion_core::codec::{decode, encode};
//! use code_companion_core::models::Snippet;
//!
//! let snippet = Snippet {
//!     id: "main.go:3".to_string(),
//!     file_path: "main.go".to_string(),
//!     language: "go".to_string(),
//!     function_name: "main".to_string(),
//!     code: "func main() {}".to_string(),
//!     start_line: 3,
//!     end_line: 3,
//!     doc_string: String::new(),
//! };
//! let decoded = decode(&encode(&snippet));
//! assert_eq!(decoded.body, snippet.code);
//! assert_eq!(decoded.function_name, "main");
//! ```

use serde::Serialize;

use crate::error::CompanionError;
use crate::models::Snippet;

pub const FILE_PREFIX: &str = "// file: ";
pub const FUNCTION_PREFIX: &str = "// function: ";
pub const LINES_PREFIX: &str = "// lines: ";
pub const DOC_PREFIX: &str = "/* doc: ";
pub const DOC_SUFFIX: &str = " */";

/// Fields recovered from stored text.
///
/// Fields missing from the header decode to an empty string or `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedSnippet {
    pub file_path: String,
    pub function_name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub doc_string: String,
    pub body: String,
    /// Number of header lines consumed before the body.
    pub header_lines: usize,
}

impl DecodedSnippet {
    /// True when any structured field was recovered from the header.
    pub fn has_metadata(&self) -> bool {
        !self.file_path.is_empty()
            || !self.function_name.is_empty()
            || self.has_line_range()
            || !self.doc_string.is_empty()
    }

    pub fn has_line_range(&self) -> bool {
        self.start_line > 0 || self.end_line > 0
    }
}

/// A single parsed header line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Header {
    File(String),
    Function(String),
    Lines(usize, usize),
    Doc(String),
}

/// Serialize a snippet into header + body text.
pub fn encode(snippet: &Snippet) -> String {
    let mut out = String::with_capacity(snippet.code.len() + 128);

    out.push_str(FILE_PREFIX);
    out.push_str(&single_line(&snippet.file_path));
    out.push('\n');

    if !snippet.function_name.is_empty() {
        out.push_str(FUNCTION_PREFIX);
        out.push_str(&single_line(&snippet.function_name));
        out.push('\n');
    }

    if snippet.start_line > 0 || snippet.end_line > 0 {
        out.push_str(&format!(
            "{}{}-{}\n",
            LINES_PREFIX, snippet.start_line, snippet.end_line
        ));
    }

    let doc = flatten_doc(&snippet.doc_string);
    if !doc.is_empty() {
        out.push_str(DOC_PREFIX);
        out.push_str(&doc);
        out.push_str(DOC_SUFFIX);
        out.push('\n');
    }

    out.push_str(&snippet.code);
    out
}

/// Recover structured fields and the exact body from stored text.
///
/// Never fails: text without a header decodes to an empty header and a body
/// equal to the whole input.
pub fn decode(text: &str) -> DecodedSnippet {
    let mut decoded = DecodedSnippet::default();
    let mut offset = 0;

    for raw_line in text.split_inclusive('\n') {
        // A header line always ends in a newline; a final unterminated line
        // is body even if it looks like a header.
        let Some(line) = raw_line.strip_suffix('\n') else {
            break;
        };
        let line = line.strip_suffix('\r').unwrap_or(line);

        match parse_header(line) {
            Ok(Some(header)) => {
                apply(&mut decoded, header);
                decoded.header_lines += 1;
                offset += raw_line.len();
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(error = %err, "treating malformed header line as body");
                break;
            }
        }
    }

    decoded.body = text[offset..].to_string();
    decoded
}

fn apply(decoded: &mut DecodedSnippet, header: Header) {
    match header {
        Header::File(path) => decoded.file_path = path,
        Header::Function(name) => decoded.function_name = name,
        Header::Lines(start, end) => {
            decoded.start_line = start;
            decoded.end_line = end;
        }
        Header::Doc(doc) => decoded.doc_string = doc,
    }
}

/// `Ok(None)` for a line without a header prefix, `Err` for a recognized
/// prefix with a value that cannot be read back.
fn parse_header(line: &str) -> Result<Option<Header>, CompanionError> {
    if let Some(rest) = line.strip_prefix(FILE_PREFIX) {
        return Ok(Some(Header::File(rest.to_string())));
    }

    // File and function values are taken verbatim so padded names survive.
    if let Some(rest) = line.strip_prefix(FUNCTION_PREFIX) {
        if rest.is_empty() {
            return Err(inconsistency(line, "empty function name"));
        }
        return Ok(Some(Header::Function(rest.to_string())));
    }

    if let Some(rest) = line.strip_prefix(LINES_PREFIX) {
        return parse_line_range(rest.trim())
            .map(|(start, end)| Some(Header::Lines(start, end)))
            .ok_or_else(|| inconsistency(line, "expected <start>-<end>"));
    }

    if let Some(rest) = line.strip_prefix(DOC_PREFIX) {
        let doc = rest
            .strip_suffix(DOC_SUFFIX)
            .ok_or_else(|| inconsistency(line, "unterminated doc comment"))?;
        return Ok(Some(Header::Doc(doc.trim().to_string())));
    }

    Ok(None)
}

fn parse_line_range(value: &str) -> Option<(usize, usize)> {
    let (start, end) = value.split_once('-')?;
    let start = start.trim().parse::<usize>().ok()?;
    let end = end.trim().parse::<usize>().ok()?;
    if start > end {
        return None;
    }
    Some((start, end))
}

fn inconsistency(line: &str, reason: &str) -> CompanionError {
    CompanionError::EncodingInconsistency {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

/// Collapse whitespace to single spaces and break any `*/` so the doc text
/// cannot close its own comment.
fn flatten_doc(doc: &str) -> String {
    doc.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("*/", "* /")
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
