//! Indexing pipeline orchestration.
//!
//! Coordinates the full index flow: scanner → extraction → encoding →
//! storage. Each file is an independent unit of work; files run
//! concurrently up to `index.concurrency`, and a file that fails to parse or
//! store is logged, recorded in the [`IndexReport`], and skipped.
//!
//! Snippet ids are `path:start_line`, and stores replace documents by id,
//! so indexing the same tree twice leaves the store unchanged.

use anyhow::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use code_companion_core::store::memory::InMemoryStore;
use code_companion_core::store::{Metadata, SnippetStore, StoreDocument};
use code_companion_core::{encode, CompanionError, Snippet};

use crate::chroma::ChromaStore;
use crate::config::Config;
use crate::embedding;
use crate::extract::extractor_for_path;
use crate::scanner::Scanner;

/// A file that could not be indexed.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one [`index_tree`] run.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_failed: usize,
    pub snippets_added: usize,
    pub failures: Vec<FileFailure>,
}

impl IndexReport {
    fn record_failure(&mut self, path: PathBuf, error: String) {
        self.files_failed += 1;
        self.failures.push(FileFailure { path, error });
    }
}

/// Index every eligible file under the scanner's roots into `store`.
///
/// Never fails as a whole: per-file errors end up in
/// [`IndexReport::failures`].
pub async fn index_tree(
    scanner: &Scanner,
    store: Arc<dyn SnippetStore>,
    concurrency: usize,
) -> IndexReport {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks: JoinSet<(PathBuf, usize, Option<CompanionError>)> = JoinSet::new();
    let mut report = IndexReport::default();

    // The directory walk is blocking I/O; run it off the async workers and
    // feed paths through a bounded channel.
    let (tx, mut rx) = mpsc::channel::<Result<PathBuf>>(concurrency * 4);
    let walker = scanner.clone();
    let walk = tokio::task::spawn_blocking(move || {
        for item in walker.files() {
            if tx.blocking_send(item).is_err() {
                break;
            }
        }
    });

    while let Some(item) = rx.recv().await {
        let path = match item {
            Ok(path) => path,
            Err(e) => {
                let path = e
                    .downcast_ref::<walkdir::Error>()
                    .and_then(|w| w.path())
                    .map(|p| p.to_path_buf())
                    .unwrap_or_default();
                tracing::warn!(error = %format!("{:#}", e), "skipping unreadable path");
                report.record_failure(path, format!("{:#}", e));
                continue;
            }
        };
        report.files_scanned += 1;

        // Wait for a slot before spawning so the walk never runs far ahead.
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let store = store.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let (added, error) = index_file(&path, store.as_ref()).await;
            (path, added, error)
        });

        while let Some(done) = tasks.try_join_next() {
            collect(&mut report, done);
        }
    }

    if let Err(e) = walk.await {
        tracing::warn!(error = %e, "directory walk panicked");
    }

    while let Some(done) = tasks.join_next().await {
        collect(&mut report, done);
    }

    tracing::info!(
        scanned = report.files_scanned,
        indexed = report.files_indexed,
        failed = report.files_failed,
        snippets = report.snippets_added,
        "index complete"
    );
    report
}

fn collect(
    report: &mut IndexReport,
    done: Result<(PathBuf, usize, Option<CompanionError>), tokio::task::JoinError>,
) {
    match done {
        Ok((path, added, None)) => {
            tracing::debug!(path = %path.display(), snippets = added, "indexed file");
            report.files_indexed += 1;
            report.snippets_added += added;
        }
        Ok((path, _, Some(err))) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to index file");
            report.record_failure(path, err.to_string());
        }
        Err(e) => {
            tracing::warn!(error = %e, "index task panicked");
            report.record_failure(PathBuf::new(), e.to_string());
        }
    }
}

/// Extract, encode and store one file as a single batch. Returns the number
/// of snippets stored.
async fn index_file(path: &Path, store: &dyn SnippetStore) -> (usize, Option<CompanionError>) {
    let snippets = match extract_file(path).await {
        Ok(snippets) => snippets,
        Err(e) => return (0, Some(e)),
    };

    let indexed_at = Utc::now().to_rfc3339();
    let docs: Vec<StoreDocument> = snippets
        .iter()
        .map(|snippet| StoreDocument {
            id: snippet.id.clone(),
            text: encode(snippet),
            metadata: snippet_metadata(snippet, &indexed_at),
        })
        .collect();

    match store.add_batch(&docs).await {
        Ok(()) => (docs.len(), None),
        Err(e) => {
            let target = path.display().to_string();
            (0, Some(CompanionError::storage("add", target, e)))
        }
    }
}

async fn extract_file(path: &Path) -> Result<Vec<Snippet>, CompanionError> {
    let extractor = extractor_for_path(path)
        .ok_or_else(|| CompanionError::parse(path, "no extractor for this file type"))?;
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || extractor.extract(&owned))
        .await
        .map_err(|e| CompanionError::parse(path, e))?
}

/// Metadata stored alongside each snippet.
pub fn snippet_metadata(snippet: &Snippet, indexed_at: &str) -> Metadata {
    let mut hasher = Sha256::new();
    hasher.update(snippet.code.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());

    let mut metadata = Metadata::new();
    metadata.insert("language".to_string(), snippet.language.clone());
    metadata.insert("file".to_string(), snippet.file_path.clone());
    metadata.insert("function_name".to_string(), snippet.function_name.clone());
    metadata.insert("start_line".to_string(), snippet.start_line.to_string());
    metadata.insert("end_line".to_string(), snippet.end_line.to_string());
    metadata.insert("content_hash".to_string(), content_hash);
    metadata.insert("indexed_at".to_string(), indexed_at.to_string());
    metadata
}

/// Entry point for `companion index`.
///
/// `roots` replaces the configured roots when non-empty. With `dry_run`
/// the snippets go into a throwaway in-memory store instead of Chroma.
pub async fn run_index(config: &Config, roots: &[PathBuf], dry_run: bool) -> Result<()> {
    let mut index_config = config.index.clone();
    if !roots.is_empty() {
        index_config.roots = roots.to_vec();
    }
    let scanner = Scanner::from_config(&index_config)?;

    let store: Arc<dyn SnippetStore> = if dry_run {
        Arc::new(InMemoryStore::new())
    } else {
        let embedder = embedding::create_provider(&config.embedding)?;
        Arc::new(ChromaStore::connect(&config.store, embedder).await?)
    };

    let report = index_tree(&scanner, store, index_config.concurrency).await;

    if dry_run {
        println!("index (dry-run)");
    } else {
        println!("index");
    }
    for root in scanner.roots() {
        println!("  root: {}", root.display());
    }
    println!("  files scanned: {}", report.files_scanned);
    println!("  files indexed: {}", report.files_indexed);
    println!("  files failed: {}", report.files_failed);
    println!("  snippets: {}", report.snippets_added);
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.path.display(), failure.error);
    }
    println!("ok");

    Ok(())
}
