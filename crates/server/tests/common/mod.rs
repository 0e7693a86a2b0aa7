//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port. The text-to-SQL path runs
//! against the seeded in-memory observation database with a scripted chat model,
//! and the retrieval path uses the mock embedder and vector store with the
//! completion API served by `httpmock`.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use argo_rag::{
    config::AppConfig, CompletionClient, PromptClientBuilder, RagQueryEngine,
};
use argo_rag_server::{router, state::AppState};
use argo_rag_test_utils::{MockAiProvider, MockEmbedder, MockVectorStore, ObservationDb};
use axum::serve;
use httpmock::MockServer;
use reqwest::Client;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, task::JoinHandle};

pub const GENERATION_KEY: &str = "expert SQL assistant";
pub const SUMMARY_KEY: &str = "explains database results";
pub const COMPLETION_PATH: &str = "/chat/completions";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub ai: MockAiProvider,
    pub vector_store: MockVectorStore,
    pub app_state: AppState,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

/// A configuration built from the defaults, with `overrides` applied on top.
pub fn test_config(overrides: serde_json::Value) -> AppConfig {
    let mut base = json!({ "port": 0, "top_k": 2, "retries": 2, "backoff_ms": 10 });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        base.extend(extra.clone());
    }
    serde_json::from_value(base).unwrap()
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_config(test_config(json!({}))).await
    }

    pub async fn spawn_with_config(config: AppConfig) -> Result<Self> {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start_async().await;
        let fixture = ObservationDb::new().await?;
        let ai = MockAiProvider::new();
        let prompt_client = PromptClientBuilder::new()
            .ai_provider(Box::new(ai.clone()))
            .storage_provider(Box::new(fixture.provider.clone()))
            .table_name(&config.source_table)
            .build()?;

        let vector_store = MockVectorStore::new();
        let completion = CompletionClient::new(
            mock_server.url(COMPLETION_PATH),
            Some("pplx-test".to_string()),
            config.perplexity_model.clone(),
            Duration::from_secs(5),
            config.backoff(),
        )?;
        let rag_engine = RagQueryEngine::new(
            Arc::new(MockEmbedder::new()),
            Arc::new(vector_store.clone()),
            completion,
            config.retries,
        );

        let app_state = AppState {
            config: Arc::new(config),
            prompt_client: Arc::new(prompt_client),
            rag_engine: Arc::new(rag_engine),
        };
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            ai,
            vector_store,
            app_state: app_state_for_harness,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
