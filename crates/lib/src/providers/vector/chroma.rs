//! # Chroma Vector Store
//!
//! A [`VectorStore`] backed by a Chroma server or Chroma Cloud through its v2 REST API.
//!
//! The collection id is looked up (or the collection created) on first use and
//! cached inside the client. Construct one client and pass it by reference; clones
//! share the cached id.

use super::{ensure_aligned, VectorStore};
use crate::{
    errors::PromptError,
    types::{Chunk, RetrievedChunk},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub const DEFAULT_TENANT: &str = "default_tenant";
pub const DEFAULT_DATABASE: &str = "default_database";

#[derive(Serialize)]
struct GetOrCreateCollection<'a> {
    name: &'a str,
    get_or_create: bool,
}

#[derive(Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: &'a [Vec<f32>],
    documents: Vec<&'a str>,
    metadatas: Vec<&'a Map<String, Value>>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'a str; 3],
}

#[derive(Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f64>>>>,
}

/// Connection settings for [`ChromaVectorStore`].
#[derive(Debug, Clone)]
pub struct ChromaSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub tenant: String,
    pub database: String,
    pub collection: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ChromaVectorStore {
    client: ReqwestClient,
    settings: ChromaSettings,
    collection_id: Arc<OnceCell<String>>,
}

impl ChromaVectorStore {
    pub fn new(settings: ChromaSettings) -> Result<Self, PromptError> {
        let client = ReqwestClient::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(PromptError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            settings,
            collection_id: Arc::new(OnceCell::new()),
        })
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.tenant,
            self.settings.database
        )
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.post(url);
        match &self.settings.api_key {
            Some(key) => builder.header("x-chroma-token", key),
            None => builder,
        }
    }

    async fn collection_id(&self) -> Result<&str, PromptError> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                info!(collection = %self.settings.collection, "Resolving Chroma collection");
                let body = GetOrCreateCollection {
                    name: &self.settings.collection,
                    get_or_create: true,
                };
                let response = self
                    .request(self.collections_url())
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| PromptError::VectorStore(e.to_string()))?;
                let response = check_status(response).await?;
                let collection: CollectionResponse = response
                    .json()
                    .await
                    .map_err(|e| PromptError::VectorStore(e.to_string()))?;
                Ok::<_, PromptError>(collection.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PromptError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(PromptError::VectorStore(format!("Chroma returned {status}: {body}")))
}

#[async_trait]
impl VectorStore for ChromaVectorStore {
    fn name(&self) -> &str {
        "Chroma"
    }

    fn collection(&self) -> &str {
        &self.settings.collection
    }

    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), PromptError> {
        ensure_aligned(chunks, embeddings)?;
        if chunks.is_empty() {
            return Ok(());
        }
        let collection_id = self.collection_id().await?;
        let body = UpsertRequest {
            ids: chunks.iter().map(|c| c.id.as_str()).collect(),
            embeddings,
            documents: chunks.iter().map(|c| c.content.as_str()).collect(),
            metadatas: chunks.iter().map(|c| &c.metadata).collect(),
        };
        let url = format!("{}/{collection_id}/upsert", self.collections_url());
        debug!(url = %url, count = chunks.len(), "--> Upserting chunks to Chroma");
        let response = self
            .request(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;
        check_status(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, PromptError> {
        let collection_id = self.collection_id().await?;
        let body = QueryRequest {
            query_embeddings: [embedding],
            n_results: k,
            include: ["documents", "metadatas", "distances"],
        };
        let url = format!("{}/{collection_id}/query", self.collections_url());
        let response = self
            .request(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;
        let parsed: QueryResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;
        Ok(flatten_query_response(parsed))
    }
}

/// Chroma answers per query embedding; we always send exactly one.
fn flatten_query_response(response: QueryResponse) -> Vec<RetrievedChunk> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let mut documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();

    ids.into_iter()
        .map(|id| RetrievedChunk {
            id,
            content: documents.next().flatten().unwrap_or_default(),
            metadata: metadatas.next().flatten().unwrap_or_default(),
            distance: distances.next().flatten().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_query_response_keeps_rank_order() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["b", "a"]],
            "documents": [["second", null]],
            "metadatas": [[{"table": "argo"}, null]],
            "distances": [[0.1, 0.4]]
        }))
        .unwrap();
        let chunks = flatten_query_response(response);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "b");
        assert_eq!(chunks[0].content, "second");
        assert_eq!(chunks[0].metadata["table"], "argo");
        assert_eq!(chunks[1].content, "");
        assert!((chunks[1].distance - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_flatten_empty_response() {
        assert!(flatten_query_response(QueryResponse::default()).is_empty());
    }
}
