//! [`SnippetStore`] backed by a Chroma server (HTTP API v2).
//!
//! Chroma keeps documents and vectors and answers nearest-neighbour queries.
//! It does not compute embeddings for HTTP clients, so every document and
//! query goes through the configured [`EmbeddingProvider`] first.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | connect | `GET /api/v2/heartbeat`, `POST .../collections` (get or create) |
//! | [`add`](SnippetStore::add), [`add_batch`](SnippetStore::add_batch) | `POST .../collections/{id}/upsert` |
//! | [`search`](SnippetStore::search) | `POST .../collections/{id}/query` |
//!
//! `upsert` replaces a document with the same id, so re-indexing a file does
//! not duplicate its snippets. A batch is embedded in `embedding.batch_size`
//! chunks and written with a single upsert.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use code_companion_core::store::{Metadata, SnippetStore, StoreDocument};
use code_companion_core::SearchResult;

use crate::config::StoreConfig;
use crate::embedding::{embed_one, EmbeddingProvider};

pub struct ChromaStore {
    client: reqwest::Client,
    /// `{url}/api/v2/tenants/{tenant}/databases/{database}`
    base: String,
    collection_id: String,
    embedder: Box<dyn EmbeddingProvider>,
}

impl ChromaStore {
    /// Check the server is reachable and get or create the collection.
    pub async fn connect(
        config: &StoreConfig,
        embedder: Box<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = config.url.trim_end_matches('/');

        client
            .get(format!("{}/api/v2/heartbeat", url))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Chroma is not reachable at {}", url))?;

        let base = format!(
            "{}/api/v2/tenants/{}/databases/{}",
            url, config.tenant, config.database
        );

        let body = serde_json::json!({
            "name": config.collection,
            "metadata": {
                "type": "code",
                "embedding_model": embedder.model_name(),
            },
            "get_or_create": true,
        });
        let json = post_json(&client, &format!("{}/collections", base), &body)
            .await
            .with_context(|| format!("Failed to open collection '{}'", config.collection))?;

        let collection_id = json
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Invalid Chroma response: collection has no id"))?
            .to_string();

        tracing::debug!(
            collection = %config.collection,
            id = %collection_id,
            "opened Chroma collection"
        );

        Ok(Self {
            client,
            base,
            collection_id,
            embedder,
        })
    }

    fn collection_url(&self, action: &str) -> String {
        format!("{}/collections/{}/{}", self.base, self.collection_id, action)
    }
}

#[async_trait]
impl SnippetStore for ChromaStore {
    async fn add(&self, id: &str, text: &str, metadata: &Metadata) -> Result<()> {
        let doc = StoreDocument {
            id: id.to_string(),
            text: text.to_string(),
            metadata: metadata.clone(),
        };
        self.add_batch(std::slice::from_ref(&doc)).await
    }

    async fn add_batch(&self, docs: &[StoreDocument]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = docs.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != docs.len() {
            bail!(
                "Embedding provider returned {} vectors for {} documents",
                vectors.len(),
                docs.len()
            );
        }
        let body = upsert_body(docs, &vectors);
        post_json(&self.client, &self.collection_url("upsert"), &body).await?;
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vector = embed_one(self.embedder.as_ref(), query).await?;
        let body = serde_json::json!({
            "query_embeddings": [vector],
            "n_results": k,
            "include": ["documents", "distances"],
        });
        let json = post_json(&self.client, &self.collection_url("query"), &body).await?;
        parse_query_response(&json)
    }
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value> {
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("Chroma API error {}: {}", status, body_text);
    }
    Ok(response.json().await?)
}

fn upsert_body(docs: &[StoreDocument], vectors: &[Vec<f32>]) -> serde_json::Value {
    serde_json::json!({
        "ids": docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
        "documents": docs.iter().map(|d| d.text.as_str()).collect::<Vec<_>>(),
        "metadatas": docs.iter().map(|d| &d.metadata).collect::<Vec<_>>(),
        "embeddings": vectors,
    })
}

/// Flatten the first query group of a Chroma `query` response.
///
/// Chroma answers with one group per query embedding; we always send one.
/// Entries whose document is `null` are skipped.
fn parse_query_response(json: &serde_json::Value) -> Result<Vec<SearchResult>> {
    let first_group = |key: &str| -> Result<Vec<serde_json::Value>> {
        Ok(json
            .get(key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Invalid Chroma response: missing {}", key))?
            .first()
            .and_then(|g| g.as_array())
            .cloned()
            .unwrap_or_default())
    };

    let documents = first_group("documents")?;
    let distances = first_group("distances")?;

    Ok(documents
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| {
            let text = doc.as_str()?;
            let distance = distances.get(i).and_then(|d| d.as_f64()).unwrap_or(f64::MAX);
            Some(SearchResult::new(text, distance))
        })
        .collect())
}
