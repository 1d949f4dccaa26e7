//! Storage abstraction for Code Companion.
//!
//! The [`SnippetStore`] trait is the only contract the pipelines have with a
//! similarity-search backend: add a document under an id, and search by
//! free text. Backends are treated as opaque text stores. The `metadata` map
//! passed to [`add`](SnippetStore::add) is best-effort; nothing on the query
//! path reads it back, because the encoded text already carries the fields.
//!
//! Implementations must be `Send + Sync`, and `add` must be safe to call
//! concurrently with distinct ids.

pub mod memory;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SearchResult;

/// Metadata attached to a stored document.
pub type Metadata = BTreeMap<String, String>;

/// One document for [`SnippetStore::add_batch`].
#[derive(Debug, Clone)]
pub struct StoreDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// Opaque text store with similarity search.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](SnippetStore::add) | Insert or replace the document stored under `id` |
/// | [`add_batch`](SnippetStore::add_batch) | Insert or replace several documents |
/// | [`search`](SnippetStore::search) | Up to `k` documents ranked by ascending distance |
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Insert or replace the document stored under `id`.
    ///
    /// The call either stores the whole `text` or fails; callers never see
    /// a partially written document.
    async fn add(&self, id: &str, text: &str, metadata: &Metadata) -> Result<()>;

    /// Insert or replace every document in `docs`.
    ///
    /// The default calls [`add`](SnippetStore::add) for each document in
    /// order and stops at the first failure. Backends with a bulk endpoint
    /// override it.
    async fn add_batch(&self, docs: &[StoreDocument]) -> Result<()> {
        for doc in docs {
            self.add(&doc.id, &doc.text, &doc.metadata).await?;
        }
        Ok(())
    }

    /// Return up to `k` documents for `query`, most relevant first.
    ///
    /// An empty store yields an empty list, not an error.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;
}
