//! In-memory [`SnippetStore`] for tests and dry runs.
//!
//! Documents live in a `Vec` behind a `std::sync::RwLock`. Search is a
//! term-overlap scan: `distance = 1 - matched_terms / query_terms`, so a
//! document containing every query term has distance `0.0`. Documents sharing
//! no term with the query are not returned.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{Metadata, SnippetStore};
use crate::models::SearchResult;

struct StoredDoc {
    id: String,
    text: String,
    text_lower: String,
    metadata: Metadata,
}

/// In-memory store keyed by document id, preserving insertion order.
pub struct InMemoryStore {
    docs: RwLock<Vec<StoredDoc>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored text for `id`, if present.
    pub fn get(&self, id: &str) -> Option<String> {
        let docs = self.docs.read().ok()?;
        docs.iter().find(|d| d.id == id).map(|d| d.text.clone())
    }

    /// Stored metadata for `id`, if present.
    pub fn metadata(&self, id: &str) -> Option<Metadata> {
        let docs = self.docs.read().ok()?;
        docs.iter().find(|d| d.id == id).map(|d| d.metadata.clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnippetStore for InMemoryStore {
    async fn add(&self, id: &str, text: &str, metadata: &Metadata) -> Result<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let doc = StoredDoc {
            id: id.to_string(),
            text: text.to_string(),
            text_lower: text.to_lowercase(),
            metadata: metadata.clone(),
        };
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        let query_lower = query.to_lowercase();
        let mut terms: Vec<&str> = query_lower
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
            .collect();
        terms.sort_unstable();
        terms.dedup();
        if terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let docs = self
            .docs
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;

        let mut scored: Vec<(usize, f64)> = docs
            .iter()
            .enumerate()
            .filter_map(|(pos, doc)| {
                let matched = terms
                    .iter()
                    .filter(|t| doc.text_lower.contains(**t))
                    .count();
                if matched == 0 {
                    return None;
                }
                Some((pos, 1.0 - matched as f64 / terms.len() as f64))
            })
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, distance)| SearchResult::new(docs[pos].text.clone(), distance))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreDocument;

    fn meta(lang: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("language".to_string(), lang.to_string());
        m
    }

    #[tokio::test]
    async fn test_empty_store_returns_no_results() {
        let store = InMemoryStore::new();
        let results = store.search("explain X", 3).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_add_same_id_replaces() {
        let store = InMemoryStore::new();
        store.add("a.go:1", "func Old() {}", &meta("go")).await.unwrap();
        store.add("a.go:1", "func New() {}", &meta("go")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.go:1").unwrap(), "func New() {}");
    }

    #[tokio::test]
    async fn test_add_batch_stores_every_document() {
        let store = InMemoryStore::new();
        let docs: Vec<StoreDocument> = ["a.go:1", "a.go:9", "a.go:1"]
            .iter()
            .enumerate()
            .map(|(i, id)| StoreDocument {
                id: id.to_string(),
                text: format!("func F{}() {{}}", i),
                metadata: meta("go"),
            })
            .collect();
        store.add_batch(&docs).await.unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a.go:1").unwrap(), "func F2() {}");
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let store = InMemoryStore::new();
        store.add("1", "func LoadScene() { scene }", &meta("go")).await.unwrap();
        store.add("2", "func Render() { draw scene sprites }", &meta("go")).await.unwrap();
        store.add("3", "func Unrelated() {}", &meta("go")).await.unwrap();

        let results = store.search("draw scene", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].text.contains("Render"));
        assert_eq!(results[0].distance, 0.0);
        assert!((results[1].distance - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_search_respects_k() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .add(&i.to_string(), "func scene() {}", &meta("go"))
                .await
                .unwrap();
        }
        assert_eq!(store.search("scene", 2).await.unwrap().len(), 2);
        assert!(store.search("scene", 0).await.unwrap().is_empty());
    }
}
