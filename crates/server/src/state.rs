//! # Application State
//!
//! The shared state handed to every handler: the configuration and the two
//! answer paths, each built once at startup.

use argo_rag::{
    config::AppConfig,
    providers::factory::{build_prompt_client, build_rag_engine},
    PromptClient, RagQueryEngine,
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// The text-to-SQL path.
    pub prompt_client: Arc<PromptClient>,
    /// The retrieval path.
    pub rag_engine: Arc<RagQueryEngine>,
}

/// Builds the shared application state from the configuration.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let prompt_client = build_prompt_client(&config).await?;
    info!(
        "Text-to-SQL path ready on table '{}' ({})",
        prompt_client.table_name(),
        config.database_uri
    );
    let rag_engine = build_rag_engine(&config).await?;

    Ok(AppState {
        config: Arc::new(config),
        prompt_client: Arc::new(prompt_client),
        rag_engine: Arc::new(rag_engine),
    })
}
