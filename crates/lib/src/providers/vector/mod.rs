//! # Vector Stores
//!
//! The vector store holds embedded chunks for the retrieval path. Similarity
//! metric and index structure are the backend's business; callers only see
//! ranked [`RetrievedChunk`]s.

pub mod chroma;
pub mod sqlite;

use crate::{
    errors::PromptError,
    types::{Chunk, RetrievedChunk},
};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

pub use chroma::ChromaVectorStore;
pub use sqlite::SqliteVectorStore;

#[async_trait]
pub trait VectorStore: Send + Sync + Debug + DynClone {
    /// Returns the name of the backend (e.g., "SQLite", "Chroma").
    fn name(&self) -> &str;

    /// The collection this store reads and writes.
    fn collection(&self) -> &str;

    /// Stores `chunks` with their `embeddings` (same length, same order).
    ///
    /// Writing a chunk id that already exists replaces the earlier copy.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), PromptError>;

    /// Returns up to `k` chunks nearest to `embedding`, closest first.
    async fn query(&self, embedding: &[f32], k: usize)
        -> Result<Vec<RetrievedChunk>, PromptError>;
}

dyn_clone::clone_trait_object!(VectorStore);

pub(crate) fn ensure_aligned(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), PromptError> {
    if chunks.len() != embeddings.len() {
        return Err(PromptError::VectorStore(format!(
            "{} chunks were given {} embeddings",
            chunks.len(),
            embeddings.len()
        )));
    }
    Ok(())
}
