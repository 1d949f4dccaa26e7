//! Function-level snippet extraction via tree-sitter.
//!
//! An [`Extractor`] turns one source file into the ordered list of
//! [`Snippet`]s for the functions and methods it declares. Each snippet's
//! `code` is the exact byte range of the declaration node in the original
//! text, so what gets indexed is what the user sees in their editor.
//!
//! | Extractor | Extensions | Declarations |
//! |-----------|------------|--------------|
//! | [`GoExtractor`] | `.go` | file-scope `func` and methods |
//! | [`RustExtractor`] | `.rs` | file-scope `fn` and `fn` inside `impl` blocks |
//!
//! Files with syntax errors are rejected with [`CompanionError::Parse`]
//! naming the first error position. Extraction only ever reads the file.

use std::path::Path;

use code_companion_core::{CompanionError, Snippet};
use tree_sitter::{Language, Node, Parser, Tree};

/// Parses one language into snippets.
pub trait Extractor: Send + Sync {
    /// Language tag stored on every snippet (`"go"`, `"rust"`).
    fn language(&self) -> &'static str;

    /// File extensions handled, lowercase and without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Extract snippets from already-loaded source text.
    ///
    /// `file_path` is recorded on the snippets and used in their ids.
    fn extract_source(&self, file_path: &str, source: &str)
        -> Result<Vec<Snippet>, CompanionError>;

    /// Read `path` and extract its snippets.
    fn extract(&self, path: &Path) -> Result<Vec<Snippet>, CompanionError> {
        let source = read_source(path)?;
        self.extract_source(&path.to_string_lossy(), &source)
    }
}

static GO: GoExtractor = GoExtractor;
static RUST: RustExtractor = RustExtractor;

/// All built-in extractors.
pub fn extractors() -> [&'static dyn Extractor; 2] {
    [&GO, &RUST]
}

/// Pick the extractor for `path` by its extension.
pub fn extractor_for_path(path: &Path) -> Option<&'static dyn Extractor> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    extractors()
        .into_iter()
        .find(|e| e.extensions().contains(&ext.as_str()))
}

fn read_source(path: &Path) -> Result<String, CompanionError> {
    let bytes = std::fs::read(path).map_err(|e| CompanionError::parse(path, e))?;
    String::from_utf8(bytes)
        .map_err(|e| CompanionError::parse(path, format!("not valid UTF-8: {}", e)))
}

// ============ Go ============

/// Extracts `func` declarations and methods from Go files.
///
/// The doc string is the comment group that ends on the line directly above
/// the declaration, with `//` and `/* */` markers removed and compiler
/// directives (`//go:...`) dropped.
pub struct GoExtractor;

impl Extractor for GoExtractor {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn extract_source(
        &self,
        file_path: &str,
        source: &str,
    ) -> Result<Vec<Snippet>, CompanionError> {
        let tree = parse_tree(&tree_sitter_go::LANGUAGE.into(), file_path, source)?;
        let root = tree.root_node();
        let mut snippets = Vec::new();

        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            if matches!(node.kind(), "function_declaration" | "method_declaration") {
                let doc = go_doc(node, source);
                snippets.push(make_snippet(node, source, file_path, self.language(), doc));
            }
        }

        Ok(snippets)
    }
}

fn go_doc(decl: Node, source: &str) -> String {
    let mut comments = Vec::new();
    let mut expected_row = decl.start_position().row;
    let mut prev = decl.prev_named_sibling();

    while let Some(node) = prev {
        if node.kind() != "comment"
            || last_row(node) + 1 != expected_row
            || !starts_line(node, source)
        {
            break;
        }
        comments.push(node_text(node, source));
        expected_row = node.start_position().row;
        prev = node.prev_named_sibling();
    }
    comments.reverse();

    let mut lines = Vec::new();
    for comment in comments {
        if let Some(body) = comment.strip_prefix("//") {
            if body.starts_with("go:") || body.starts_with("line ") {
                continue;
            }
            lines.push(body.strip_prefix(' ').unwrap_or(body).trim_end().to_string());
        } else if let Some(body) = comment.strip_prefix("/*") {
            let body = body.strip_suffix("*/").unwrap_or(body);
            lines.extend(body.lines().map(|l| l.trim_end().to_string()));
        }
    }
    lines.join("\n").trim().to_string()
}

// ============ Rust ============

/// Extracts free functions and `impl` methods from Rust files.
///
/// The doc string is the run of outer doc comments (`///` or `/** */`) above
/// the item. Attributes between the docs and the item are skipped over.
pub struct RustExtractor;

impl Extractor for RustExtractor {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn extract_source(
        &self,
        file_path: &str,
        source: &str,
    ) -> Result<Vec<Snippet>, CompanionError> {
        let tree = parse_tree(&tree_sitter_rust::LANGUAGE.into(), file_path, source)?;
        let root = tree.root_node();
        let mut snippets = Vec::new();

        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "function_item" => {
                    let doc = rust_doc(node, source);
                    snippets.push(make_snippet(node, source, file_path, self.language(), doc));
                }
                "impl_item" => {
                    let Some(body) = node.child_by_field_name("body") else {
                        continue;
                    };
                    let mut body_cursor = body.walk();
                    for item in body.named_children(&mut body_cursor) {
                        if item.kind() == "function_item" {
                            let doc = rust_doc(item, source);
                            snippets.push(make_snippet(
                                item,
                                source,
                                file_path,
                                self.language(),
                                doc,
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(snippets)
    }
}

fn rust_doc(item: Node, source: &str) -> String {
    let mut docs = Vec::new();
    let mut expected_row = item.start_position().row;
    let mut prev = item.prev_named_sibling();

    while let Some(node) = prev {
        if last_row(node) + 1 != expected_row {
            break;
        }
        match node.kind() {
            "attribute_item" => {}
            "line_comment" | "block_comment" => {
                let text = node_text(node, source);
                if !is_outer_doc(text) {
                    break;
                }
                docs.push(text);
            }
            _ => break,
        }
        expected_row = node.start_position().row;
        prev = node.prev_named_sibling();
    }
    docs.reverse();

    let mut lines = Vec::new();
    for doc in docs {
        if let Some(body) = doc.strip_prefix("///") {
            let body = body.trim_end_matches(['\r', '\n']);
            lines.push(body.strip_prefix(' ').unwrap_or(body).trim_end().to_string());
        } else if let Some(body) = doc.strip_prefix("/**") {
            let body = body.strip_suffix("*/").unwrap_or(body);
            for line in body.lines() {
                let line = line.trim();
                let line = line.strip_prefix('*').unwrap_or(line);
                lines.push(line.strip_prefix(' ').unwrap_or(line).trim_end().to_string());
            }
        }
    }
    lines.join("\n").trim().to_string()
}

fn is_outer_doc(comment: &str) -> bool {
    (comment.starts_with("///") && !comment.starts_with("////"))
        || (comment.starts_with("/**") && !comment.starts_with("/**/") && comment != "/***/")
}

// ============ Shared ============

fn parse_tree(
    language: &Language,
    file_path: &str,
    source: &str,
) -> Result<Tree, CompanionError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| CompanionError::parse(file_path, e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| CompanionError::parse(file_path, "parser produced no syntax tree"))?;

    if let Some(bad) = first_error(tree.root_node()) {
        let pos = bad.start_position();
        let what = if bad.is_missing() {
            format!("missing {}", bad.kind())
        } else {
            "syntax error".to_string()
        };
        return Err(CompanionError::parse(
            file_path,
            format!("{} at line {}, column {}", what, pos.row + 1, pos.column + 1),
        ));
    }

    Ok(tree)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn make_snippet(
    node: Node,
    source: &str,
    file_path: &str,
    language: &str,
    doc: String,
) -> Snippet {
    let start_line = node.start_position().row + 1;
    let end_line = last_row(node) + 1;
    let function_name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default();

    Snippet {
        id: Snippet::make_id(file_path, start_line),
        file_path: file_path.to_string(),
        language: language.to_string(),
        function_name,
        code: node_text(node, source).to_string(),
        start_line,
        end_line,
        doc_string: doc,
    }
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Row of the node's last character. A node whose range ends at column 0
/// swallowed its trailing newline and really ends on the previous row.
fn last_row(node: Node) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row - 1
    } else {
        end.row
    }
}

/// True when only whitespace precedes the node on its first line.
fn starts_line(node: Node, source: &str) -> bool {
    let before = &source[..node.start_byte()];
    before
        .rsplit('\n')
        .next()
        .map(|prefix| prefix.trim().is_empty())
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SCENE_GO: &str = "package scene

func Foo() {
\ta := 1
\tb := 2
\t_ = a + b
}

// Bar does X
func Bar(s *Scene) error {
\tif s == nil {
\t\treturn nil
\t}
\treturn s.Load()
}
";

    fn lines(source: &str, a: usize, b: usize) -> String {
        source
            .split_inclusive('\n')
            .skip(a - 1)
            .take(b - a + 1)
            .collect::<String>()
            .trim_end_matches('\n')
            .to_string()
    }

    #[test]
    fn test_go_two_functions() {
        let snippets = GoExtractor.extract_source("scene.go", SCENE_GO).unwrap();
        assert_eq!(snippets.len(), 2);

        let foo = &snippets[0];
        assert_eq!(foo.function_name, "Foo");
        assert_eq!((foo.start_line, foo.end_line), (3, 7));
        assert_eq!(foo.doc_string, "");
        assert_eq!(foo.language, "go");

        let bar = &snippets[1];
        assert_eq!(bar.function_name, "Bar");
        assert_eq!((bar.start_line, bar.end_line), (10, 15));
        assert_eq!(bar.doc_string, "Bar does X");
        assert_ne!(foo.id, bar.id);
        assert_eq!(bar.id, "scene.go:10");
    }

    #[test]
    fn test_go_code_is_exact_line_span() {
        let snippets = GoExtractor.extract_source("scene.go", SCENE_GO).unwrap();
        for s in &snippets {
            assert_eq!(s.code, lines(SCENE_GO, s.start_line, s.end_line));
        }
    }

    #[test]
    fn test_go_methods_and_block_docs() {
        let source = "package scene

/*
Draw renders the scene.
*/
func (s *Scene) Draw() {}

// Detached comment.

func Update() {}

//go:noinline
// Tick advances time.
func Tick() {}
";
        let snippets = GoExtractor.extract_source("draw.go", source).unwrap();
        let names: Vec<&str> = snippets.iter().map(|s| s.function_name.as_str()).collect();
        assert_eq!(names, vec!["Draw", "Update", "Tick"]);
        assert_eq!(snippets[0].doc_string, "Draw renders the scene.");
        assert_eq!(snippets[0].code, "func (s *Scene) Draw() {}");
        assert_eq!(snippets[1].doc_string, "");
        assert_eq!(snippets[2].doc_string, "Tick advances time.");
    }

    #[test]
    fn test_go_function_literals_are_not_snippets() {
        let source = "package main

func main() {
\tf := func() int { return 1 }
\t_ = f
}
";
        let snippets = GoExtractor.extract_source("main.go", source).unwrap();
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].function_name, "main");
    }

    #[test]
    fn test_go_syntax_error_is_parse_error() {
        let err = GoExtractor
            .extract_source("broken.go", "package x\n\nfunc Broken( {\n")
            .unwrap_err();
        match err {
            CompanionError::Parse { path, message } => {
                assert_eq!(path.to_string_lossy(), "broken.go");
                assert!(message.contains("line"), "message: {}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_go_file_without_functions() {
        let snippets = GoExtractor
            .extract_source("types.go", "package x\n\ntype T struct{}\n")
            .unwrap();
        assert!(snippets.is_empty());
    }

    #[test]
    fn test_rust_functions_and_methods() {
        let source = "/// Loads a scene.
/// Second line.
#[inline]
pub fn load() -> u32 {
    1
}

struct S;

impl S {
    /// Draws.
    fn draw(&self) {}
}

// plain comment
fn helper() {}
";
        let snippets = RustExtractor.extract_source("lib.rs", source).unwrap();
        let names: Vec<&str> = snippets.iter().map(|s| s.function_name.as_str()).collect();
        assert_eq!(names, vec!["load", "draw", "helper"]);

        assert_eq!((snippets[0].start_line, snippets[0].end_line), (4, 6));
        assert_eq!(snippets[0].doc_string, "Loads a scene.\nSecond line.");
        assert_eq!(snippets[0].code, "pub fn load() -> u32 {\n    1\n}");

        assert_eq!((snippets[1].start_line, snippets[1].end_line), (12, 12));
        assert_eq!(snippets[1].doc_string, "Draws.");
        assert_eq!(snippets[2].doc_string, "");
        assert!(snippets.iter().all(|s| s.language == "rust"));
    }

    #[test]
    fn test_extract_reads_file_without_modifying_it() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scene.go");
        fs::write(&path, SCENE_GO).unwrap();

        let snippets = GoExtractor.extract(&path).unwrap();
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].file_path, path.to_string_lossy());
        assert_eq!(fs::read_to_string(&path).unwrap(), SCENE_GO);
    }

    #[test]
    fn test_non_utf8_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bin.go");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            GoExtractor.extract(&path),
            Err(CompanionError::Parse { .. })
        ));
    }

    #[test]
    fn test_extractor_for_path() {
        assert_eq!(extractor_for_path(Path::new("a/b.go")).unwrap().language(), "go");
        assert_eq!(extractor_for_path(Path::new("lib.RS")).unwrap().language(), "rust");
        assert!(extractor_for_path(Path::new("notes.md")).is_none());
        assert!(extractor_for_path(Path::new("Makefile")).is_none());
    }
}
