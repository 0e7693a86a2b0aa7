//! # Retrieval and Completion Tests
//!
//! The completion API is an `httpmock` server; the embedder and the vector store
//! are in-memory mocks.

mod common;

use crate::common::setup_tracing;
use argo_rag::{CompletionClient, CompletionOutcome, RagQueryEngine, RetrievalAnswer};
use argo_rag_test_utils::{chunk, MockEmbedder, MockVectorStore};
use httpmock::{Method::POST, MockServer};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn completion_client(server: &MockServer) -> CompletionClient {
    CompletionClient::new(
        server.url("/chat/completions"),
        Some("pplx-test".to_string()),
        "sonar-pro".to_string(),
        Duration::from_secs(5),
        Duration::from_millis(10),
    )
    .unwrap()
}

fn seeded_store() -> MockVectorStore {
    let store = MockVectorStore::new();
    store.seed(vec![
        chunk("a", "Table: argo_observations\nRow: {\"temperature\":28.9,\"pressure\":5.0}"),
        chunk("b", "Table: float_deployments\nRow: {\"program\":\"INCOIS\"}"),
        chunk("c", "Table: argo_observations\nRow: {\"salinity\":35.0,\"pressure\":500.0}"),
    ]);
    store
}

#[tokio::test]
async fn test_answer_uses_context_from_retrieved_chunks() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer pplx-test")
                .body_contains("sonar-pro")
                .body_contains("Context:\\n")
                .body_contains("\\n\\nQuestion:\\nWhich program deployed the floats?\\nAnswer:");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "INCOIS deployed them." } }]
            }));
        })
        .await;

    let engine = RagQueryEngine::new(
        Arc::new(MockEmbedder::new()),
        Arc::new(seeded_store()),
        completion_client(&server),
        3,
    );
    let answer = engine
        .answer("Which program deployed the floats?", 2)
        .await
        .unwrap();

    completion_mock.assert_hits_async(1).await;
    assert_eq!(answer.text(), "INCOIS deployed them.");
    assert_eq!(answer.sources().len(), 2);
    assert!(matches!(
        answer,
        RetrievalAnswer::Completed { outcome: CompletionOutcome::Answer(_), .. }
    ));
}

#[tokio::test]
async fn test_no_documents_short_circuits() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        })
        .await;

    let embedder = MockEmbedder::new();
    let engine = RagQueryEngine::new(
        Arc::new(embedder.clone()),
        Arc::new(MockVectorStore::new()),
        completion_client(&server),
        3,
    );
    let answer = engine.answer("Anything about salinity?", 3).await.unwrap();

    assert!(matches!(answer, RetrievalAnswer::NoDocuments));
    assert_eq!(answer.text(), "No relevant documents found.");
    assert!(answer.sources().is_empty());
    assert_eq!(embedder.calls(), 1);
    completion_mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_always_failing_endpoint_is_tried_max_retries_times() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503).body("upstream overloaded");
        })
        .await;

    let client = completion_client(&server);
    let outcome = client.complete("Context:\nx\n\nQuestion:\ny\nAnswer:", 3).await;

    assert_eq!(outcome, CompletionOutcome::RetriesExhausted);
    assert_eq!(outcome.into_text(), "[ERROR] Failed after retries");
    completion_mock.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_backoff_waits_between_attempts_but_not_after_the_last() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(502).body("bad gateway");
        })
        .await;

    let client = CompletionClient::new(
        server.url("/chat/completions"),
        None,
        "sonar-pro".to_string(),
        Duration::from_secs(5),
        Duration::from_millis(200),
    )
    .unwrap();

    let started = Instant::now();
    let outcome = client.complete("hello", 3).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, CompletionOutcome::RetriesExhausted);
    completion_mock.assert_hits_async(3).await;
    // Two waits: after the first and the second attempt.
    assert!(elapsed >= Duration::from_millis(400), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(580), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn test_sentinel_reaches_retrieval_callers() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body("this is not json");
        })
        .await;

    let engine = RagQueryEngine::new(
        Arc::new(MockEmbedder::new()),
        Arc::new(seeded_store()),
        completion_client(&server),
        2,
    );
    let answer = engine.answer("Deepest salinity?", 3).await.unwrap();

    assert_eq!(answer.text(), "[ERROR] Failed after retries");
    assert_eq!(answer.sources().len(), 3);
    completion_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_empty_choices_is_not_retried() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({ "id": "x", "choices": [] }));
        })
        .await;

    let outcome = completion_client(&server).complete("hello", 3).await;

    assert_eq!(outcome, CompletionOutcome::EmptyChoices);
    assert_eq!(outcome.to_string(), "[ERROR] Unexpected response format");
    completion_mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_missing_content_is_retried() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .json_body(json!({ "choices": [{ "finish_reason": "length" }] }));
        })
        .await;

    let outcome = completion_client(&server).complete("hello", 2).await;

    assert_eq!(outcome, CompletionOutcome::RetriesExhausted);
    completion_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_zero_retries_makes_no_request() {
    setup_tracing();
    let server = MockServer::start_async().await;
    let completion_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .json_body(json!({ "choices": [{ "message": { "content": "hi" } }] }));
        })
        .await;

    let outcome = completion_client(&server).complete("hello", 0).await;

    assert_eq!(outcome, CompletionOutcome::RetriesExhausted);
    completion_mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_unreachable_endpoint_returns_sentinel() {
    setup_tracing();
    let client = CompletionClient::new(
        "http://127.0.0.1:9/chat/completions".to_string(),
        None,
        "sonar-pro".to_string(),
        Duration::from_millis(500),
        Duration::from_millis(1),
    )
    .unwrap();

    let outcome = client.complete("hello", 2).await;
    assert_eq!(outcome.into_text(), "[ERROR] Failed after retries");
}
