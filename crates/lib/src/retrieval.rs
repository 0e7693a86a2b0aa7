//! # Retrieval-Augmented Query Path
//!
//! Embeds a question, pulls the nearest chunks from the vector store and asks the
//! completion API to answer from that context.

use crate::{
    completion::{CompletionClient, CompletionOutcome},
    constants::NO_DOCUMENTS_FOUND,
    errors::PromptError,
    prompts::rag::{build_context, build_rag_prompt},
    providers::{ai::Embedder, vector::VectorStore},
    types::RetrievedChunk,
};
use std::sync::Arc;
use tracing::{info, warn};

/// What the retrieval path produced for one question.
#[derive(Debug, Clone)]
pub enum RetrievalAnswer {
    /// The store returned nothing; no completion call was made.
    NoDocuments,
    Completed {
        outcome: CompletionOutcome,
        sources: Vec<RetrievedChunk>,
    },
}

impl RetrievalAnswer {
    pub fn sources(&self) -> &[RetrievedChunk] {
        match self {
            RetrievalAnswer::NoDocuments => &[],
            RetrievalAnswer::Completed { sources, .. } => sources,
        }
    }

    /// The text handed back to users: the answer or a fixed sentinel.
    pub fn text(&self) -> String {
        match self {
            RetrievalAnswer::NoDocuments => NO_DOCUMENTS_FOUND.to_string(),
            RetrievalAnswer::Completed { outcome, .. } => outcome.to_string(),
        }
    }
}

/// Answers questions from the ingested chunk collection.
///
/// The embedder must be the same one the ingestion pipeline used.
#[derive(Clone, Debug)]
pub struct RagQueryEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    completion: CompletionClient,
    max_retries: u32,
}

impl RagQueryEngine {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        completion: CompletionClient,
        max_retries: u32,
    ) -> Self {
        Self {
            embedder,
            store,
            completion,
            max_retries,
        }
    }

    /// Answers `question` from the `top_k` nearest chunks.
    ///
    /// Embedding and store failures are errors. Completion failures are not: they
    /// come back as a sentinel inside [`RetrievalAnswer::Completed`].
    pub async fn answer(
        &self,
        question: &str,
        top_k: usize,
    ) -> Result<RetrievalAnswer, PromptError> {
        info!(top_k, "[rag_query] received question: {question:?}");
        let query_vector = self.embedder.embed(question).await?;
        let sources = self.store.query(&query_vector, top_k).await?;

        if sources.is_empty() {
            info!("[rag_query] no chunks retrieved from '{}'", self.store.collection());
            return Ok(RetrievalAnswer::NoDocuments);
        }
        info!("[rag_query] retrieved {} chunks", sources.len());

        let context = build_context(sources.iter().map(|c| c.content.as_str()));
        let prompt = build_rag_prompt(&context, question);
        let outcome = self.completion.complete(&prompt, self.max_retries).await;
        if !outcome.is_answer() {
            warn!("[rag_query] completion failed: {outcome}");
        }

        Ok(RetrievalAnswer::Completed { outcome, sources })
    }
}
