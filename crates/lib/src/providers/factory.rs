//! # Provider Factory
//!
//! Builds the concrete providers and clients named by an [`AppConfig`]. The server
//! and the CLI both go through here, so ingestion and retrieval always get the same
//! embedder and the same collection.

use crate::{
    completion::CompletionClient,
    config::{AppConfig, VectorBackend},
    errors::PromptError,
    ingest::{FileCheckpoint, IngestError, IngestionPipeline, TextSplitter},
    providers::{
        ai::{ApiEmbedder, Embedder, OpenAiProvider},
        db::sqlite::SqliteProvider,
        vector::{chroma::ChromaSettings, ChromaVectorStore, SqliteVectorStore, VectorStore},
    },
    retrieval::RagQueryEngine,
    text_to_sql::{PromptClient, PromptClientBuilder},
};
use std::sync::Arc;
use tracing::info;

pub fn build_chat_provider(config: &AppConfig) -> Result<OpenAiProvider, PromptError> {
    OpenAiProvider::new(
        config.openai_api_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.request_timeout(),
    )
}

pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, PromptError> {
    let embedder = ApiEmbedder::new(
        config.embeddings_api_url.clone(),
        config.embeddings_api_key.clone(),
        config.embeddings_model.clone(),
        config.request_timeout(),
    )?;
    Ok(Arc::new(embedder))
}

pub async fn build_vector_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>, PromptError> {
    let store: Arc<dyn VectorStore> = match config.vector_backend {
        VectorBackend::Sqlite => Arc::new(
            SqliteVectorStore::new(&config.vector_db_url, &config.collection_name).await?,
        ),
        VectorBackend::Chroma => Arc::new(ChromaVectorStore::new(ChromaSettings {
            api_url: config.chroma_api_url.clone(),
            api_key: config.chroma_api_key.clone(),
            tenant: config.chroma_tenant.clone(),
            database: config.chroma_database.clone(),
            collection: config.collection_name.clone(),
            timeout: config.request_timeout(),
        })?),
    };
    info!(
        "Using {} vector store, collection '{}'",
        store.name(),
        store.collection()
    );
    Ok(store)
}

pub fn build_completion_client(config: &AppConfig) -> Result<CompletionClient, PromptError> {
    CompletionClient::new(
        config.perplexity_api_url.clone(),
        config.perplexity_api_key.clone(),
        config.perplexity_model.clone(),
        config.request_timeout(),
        config.backoff(),
    )
}

/// Opens the observation database and wires it to the chat provider.
pub async fn build_prompt_client(config: &AppConfig) -> Result<PromptClient, PromptError> {
    let storage = SqliteProvider::new(&config.database_uri).await?;
    PromptClientBuilder::new()
        .ai_provider(Box::new(build_chat_provider(config)?))
        .storage_provider(Box::new(storage))
        .table_name(config.source_table.clone())
        .build()
}

pub async fn build_rag_engine(config: &AppConfig) -> Result<RagQueryEngine, PromptError> {
    Ok(RagQueryEngine::new(
        build_embedder(config)?,
        build_vector_store(config).await?,
        build_completion_client(config)?,
        config.retries,
    ))
}

pub async fn build_ingestion_pipeline(config: &AppConfig) -> Result<IngestionPipeline, IngestError> {
    IngestionPipeline::new(
        TextSplitter::new(config.chunk_size, config.chunk_overlap)?,
        config.batch_size,
        build_embedder(config)?,
        build_vector_store(config).await?,
        FileCheckpoint::new(config.checkpoint_path()),
    )
}
