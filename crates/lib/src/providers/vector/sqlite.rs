use super::{ensure_aligned, VectorStore};
use crate::{
    errors::PromptError,
    providers::db::sqlite::sql,
    types::{Chunk, RetrievedChunk},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::{self, Debug};
use tracing::{debug, info};
use turso::{params, Database, Value as TursoValue};

/// A [`VectorStore`] kept in a local SQLite file through Turso's vector functions.
#[derive(Clone)]
pub struct SqliteVectorStore {
    db: Database,
    collection: String,
}

impl SqliteVectorStore {
    /// Opens (or creates) the store at `db_path` and ensures its table exists.
    pub async fn new(db_path: &str, collection: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        let store = Self {
            db,
            collection: collection.to_string(),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Creates the backing table. Idempotent.
    pub async fn initialize_schema(&self) -> Result<(), PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        conn.execute(sql::CREATE_VECTOR_CHUNKS_TABLE, ())
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;
        Ok(())
    }

    /// Number of chunks stored in this collection.
    pub async fn count(&self) -> Result<usize, PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        let mut rows = conn
            .query(sql::COUNT_COLLECTION_CHUNKS, params![self.collection.clone()])
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;
        let count = match rows
            .next()
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?
        {
            Some(row) => match row.get_value(0) {
                Ok(TursoValue::Integer(n)) => n as usize,
                _ => 0,
            },
            None => 0,
        };
        Ok(count)
    }
}

impl Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn vector_literal(vector: &[f32]) -> String {
    format!(
        "vector32('[{}]')",
        vector
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn text_value(value: TursoValue) -> String {
    match value {
        TursoValue::Text(s) => s,
        _ => String::new(),
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), PromptError> {
        ensure_aligned(chunks, embeddings)?;
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let metadata = serde_json::to_string(&chunk.metadata)?;
            conn.execute(
                sql::UPSERT_VECTOR_CHUNK,
                params![
                    chunk.id.clone(),
                    self.collection.clone(),
                    chunk.content.clone(),
                    metadata,
                    vector_to_blob(embedding)
                ],
            )
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;
        }
        debug!(collection = %self.collection, count = chunks.len(), "Stored chunk batch");
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, PromptError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let query_sql = sql::nearest_chunks(&vector_literal(embedding), k);
        info!(collection = %self.collection, k, "Executing vector search query.");
        let mut rows = conn
            .query(&query_sql, params![self.collection.clone()])
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PromptError::VectorStore(e.to_string()))?
        {
            let read = |i: usize| {
                row.get_value(i)
                    .map_err(|e| PromptError::VectorStore(e.to_string()))
            };
            let id = text_value(read(0)?);
            let content = text_value(read(1)?);
            let metadata: Map<String, Value> = serde_json::from_str(&text_value(read(2)?))
                .map_err(|e| {
                    PromptError::VectorStore(format!("Corrupt metadata for chunk '{id}': {e}"))
                })?;
            let distance = match read(3)? {
                TursoValue::Real(f) => f,
                TursoValue::Integer(i) => i as f64,
                _ => 0.0,
            };
            results.push(RetrievedChunk {
                id,
                content,
                metadata,
                distance,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chunk(id: &str, content: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            content: content.to_string(),
            metadata: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.db");
        let store = SqliteVectorStore::new(path.to_str().unwrap(), "argo_collection")
            .await
            .unwrap();
        store
            .add(&[chunk("a", "Table: argo_observations")], &[vec![1.0, 0.0]])
            .await
            .unwrap();

        let conn = store.db.connect().unwrap();
        conn.execute("UPDATE vector_chunks SET metadata = 'not json' WHERE id = 'a'", ())
            .await
            .unwrap();

        let err = store.query(&[1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, PromptError::VectorStore(msg) if msg.contains("chunk 'a'")));
    }
}
