//! Source tree scanner.
//!
//! Walks each configured root and yields the paths of files eligible for
//! extraction. Traversal policy (extension allow-list, excludes, symlinks)
//! lives here; what happens to each file is the indexer's business.
//!
//! [`Scanner::files`] returns a lazy iterator. Calling it again restarts the
//! walk from the first root, so the same scanner can be reused across runs.
//!
//! # Excludes
//!
//! Each exclude entry is either a glob (contains one of `*?[{`), matched
//! against the path relative to its root, or a plain fragment, matched as a
//! substring of that relative path. `.git/`, `target/` and `node_modules/`
//! are always excluded.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::IndexConfig;

const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

#[derive(Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    exclude_globs: GlobSet,
    exclude_fragments: Vec<String>,
    follow_symlinks: bool,
}

impl Scanner {
    pub fn new(
        roots: Vec<PathBuf>,
        extensions: &[String],
        excludes: &[String],
        follow_symlinks: bool,
    ) -> Result<Self> {
        let (globs, fragments): (Vec<&String>, Vec<&String>) =
            excludes.iter().partition(|p| is_glob(p));

        let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        patterns.extend(globs.into_iter().cloned());

        Ok(Self {
            roots,
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_globs: build_globset(&patterns)?,
            exclude_fragments: fragments.into_iter().cloned().collect(),
            follow_symlinks,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        Self::new(
            config.roots.clone(),
            &config.extensions,
            &config.exclude,
            config.follow_symlinks,
        )
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Lazily yield eligible files under every root, in sorted order per
    /// root. Walk errors (unreadable directory, missing root) are yielded as
    /// `Err` items so the caller can log them and keep going.
    pub fn files(&self) -> impl Iterator<Item = Result<PathBuf>> + '_ {
        self.roots.iter().flat_map(move |root| {
            WalkDir::new(root)
                .follow_links(self.follow_symlinks)
                .sort_by_file_name()
                .into_iter()
                .filter_map(move |entry| match entry {
                    Ok(entry) => {
                        if !entry.file_type().is_file() {
                            return None;
                        }
                        let path = entry.into_path();
                        self.is_eligible(root, &path).then_some(Ok(path))
                    }
                    Err(e) => Some(Err(anyhow::Error::new(e)
                        .context(format!("Failed to walk {}", root.display())))),
                })
        })
    }

    /// Whether `path` (found under `root`) passes the extension and exclude
    /// filters.
    pub fn is_eligible(&self, root: &Path, path: &Path) -> bool {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if !ext_ok {
            return false;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if self.exclude_globs.is_match(&rel_str) {
            return false;
        }
        !self
            .exclude_fragments
            .iter()
            .any(|fragment| rel_str.contains(fragment.as_str()))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    fn collect(scanner: &Scanner, root: &Path) -> Vec<String> {
        scanner
            .files()
            .map(|p| {
                p.unwrap()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_filters_by_extension() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "main.go");
        touch(tmp.path(), "README.md");
        touch(tmp.path(), "pkg/scene.GO");

        let scanner =
            Scanner::new(vec![tmp.path().to_path_buf()], &["go".to_string()], &[], false).unwrap();
        assert_eq!(collect(&scanner, tmp.path()), vec!["main.go", "pkg/scene.GO"]);
    }

    #[test]
    fn test_excludes_fragments_and_globs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "main.go");
        touch(tmp.path(), "main_test.go");
        touch(tmp.path(), "vendor/lib/lib.go");
        touch(tmp.path(), ".git/hooks/x.go");

        let scanner = Scanner::new(
            vec![tmp.path().to_path_buf()],
            &[".go".to_string()],
            &["vendor/".to_string(), "**/*_test.go".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(collect(&scanner, tmp.path()), vec!["main.go"]);
    }

    #[test]
    fn test_from_config_normalizes_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.go");
        touch(tmp.path(), "b.rs");
        let config = crate::config::parse_config(&format!(
            "[index]\nroots = [{:?}]\nextensions = [\".GO\"]\n",
            tmp.path().to_string_lossy()
        ))
        .unwrap();

        let scanner = Scanner::from_config(&config.index).unwrap();
        assert_eq!(collect(&scanner, tmp.path()), vec!["a.go"]);
    }

    #[test]
    fn test_files_is_restartable() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.go");
        touch(tmp.path(), "b.go");

        let scanner =
            Scanner::new(vec![tmp.path().to_path_buf()], &["go".to_string()], &[], false).unwrap();
        assert_eq!(scanner.files().count(), 2);
        assert_eq!(scanner.files().count(), 2);
    }

    #[test]
    fn test_missing_root_yields_error() {
        let tmp = TempDir::new().unwrap();
        let scanner = Scanner::new(
            vec![tmp.path().join("does-not-exist")],
            &["go".to_string()],
            &[],
            false,
        )
        .unwrap();
        let items: Vec<_> = scanner.files().collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        assert!(Scanner::new(vec![], &["go".to_string()], &["[".to_string()], false).is_err());
    }
}
