//! # Ingestion Pipeline Tests
//!
//! Batching, checkpointing and resumption of the upload loop, using the in-memory
//! mock store and a temporary checkpoint file.

mod common;

use crate::common::setup_tracing;
use argo_rag::ingest::{
    export_tables, load_records, write_records, FileCheckpoint, IngestError, IngestionPipeline,
    TextSplitter,
};
use argo_rag::providers::vector::VectorStore;
use argo_rag::types::{Chunk, RetrievedChunk, SourceRecord};
use argo_rag::PromptError;
use argo_rag_test_utils::{chunk, MockEmbedder, MockVectorStore, ObservationDb, OBSERVATION_ROW_COUNT};
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn numbered_chunks(n: usize) -> Vec<Chunk> {
    (0..n)
        .map(|i| chunk(&format!("chunk-{i}"), &format!("Row {i}: temperature {i}.5 C")))
        .collect()
}

fn pipeline(store: Arc<dyn VectorStore>, checkpoint_path: PathBuf, batch_size: usize) -> IngestionPipeline {
    IngestionPipeline::new(
        TextSplitter::new(300, 50).unwrap(),
        batch_size,
        Arc::new(MockEmbedder::new()),
        store,
        FileCheckpoint::new(checkpoint_path),
    )
    .unwrap()
}

/// Reads the checkpoint file each time a batch arrives, before storing it.
#[derive(Clone, Debug)]
struct CheckpointObservingStore {
    inner: MockVectorStore,
    checkpoint_path: PathBuf,
    observed: Arc<Mutex<Vec<Option<String>>>>,
}

#[async_trait]
impl VectorStore for CheckpointObservingStore {
    fn name(&self) -> &str {
        "Observing"
    }

    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), PromptError> {
        let seen = std::fs::read_to_string(&self.checkpoint_path).ok();
        self.observed.lock().unwrap().push(seen);
        self.inner.add(chunks, embeddings).await
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, PromptError> {
        self.inner.query(embedding, k).await
    }
}

#[tokio::test]
async fn test_130_chunks_in_batches_of_50() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let checkpoint_path = dir.path().join("chroma_upload_checkpoint.txt");
    let inner = MockVectorStore::new();
    let store = CheckpointObservingStore {
        inner: inner.clone(),
        checkpoint_path: checkpoint_path.clone(),
        observed: Arc::new(Mutex::new(Vec::new())),
    };

    let chunks = numbered_chunks(130);
    let report = pipeline(Arc::new(store.clone()), checkpoint_path.clone(), 50)
        .upload_chunks(&chunks)
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.batches_uploaded, 3);
    assert_eq!(report.next_index, 130);
    assert_eq!(report.resumed_from, 0);

    let batches = inner.add_calls();
    let starts: Vec<&str> = batches.iter().map(|b| b[0].as_str()).collect();
    assert_eq!(starts, vec!["chunk-0", "chunk-50", "chunk-100"]);
    assert_eq!(
        batches.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![50, 50, 30]
    );

    // The checkpoint each batch saw is the one written after the previous batch.
    assert_eq!(
        *store.observed.lock().unwrap(),
        vec![None, Some("50".to_string()), Some("100".to_string())]
    );
    assert!(!checkpoint_path.exists());
}

#[tokio::test]
async fn test_checkpoint_past_the_end_is_cleared() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.txt");
    let store = MockVectorStore::new();
    // 180 chunks: batches at 0, 50, 100, 150. The last one fails, so the
    // checkpoint written after the third batch stays behind.
    store.fail_on_call(Some(4));

    let report = pipeline(Arc::new(store.clone()), checkpoint_path.clone(), 50)
        .upload_chunks(&numbered_chunks(180))
        .await
        .unwrap();
    assert_eq!(report.next_index, 150);
    assert_eq!(std::fs::read_to_string(&checkpoint_path).unwrap(), "150");

    store.fail_on_call(None);
    let report = pipeline(Arc::new(store.clone()), checkpoint_path.clone(), 50)
        .upload_chunks(&numbered_chunks(130))
        .await
        .unwrap();
    // A checkpoint past the end means there is nothing left; it is removed.
    assert!(report.is_complete());
    assert_eq!(report.batches_uploaded, 0);
    assert!(!checkpoint_path.exists());
}

#[tokio::test]
async fn test_failed_batch_halts_and_resume_completes_without_duplicates() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.txt");
    let store = MockVectorStore::new();
    store.fail_on_call(Some(2));

    let chunks = numbered_chunks(130);
    let report = pipeline(Arc::new(store.clone()), checkpoint_path.clone(), 50)
        .upload_chunks(&chunks)
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.batches_uploaded, 1);
    assert_eq!(report.next_index, 50);
    let failure = report.failure.clone().unwrap();
    assert_eq!(failure.batch_number, 2);
    assert_eq!(failure.start_index, 50);
    assert!(matches!(
        failure.into_error(),
        IngestError::Upload { batch_number: 2, start_index: 50, .. }
    ));
    // No later batch was attempted.
    assert_eq!(store.add_calls().len(), 2);
    assert_eq!(std::fs::read_to_string(&checkpoint_path).unwrap(), "50");

    store.fail_on_call(None);
    let resumed = pipeline(Arc::new(store.clone()), checkpoint_path.clone(), 50)
        .upload_chunks(&chunks)
        .await
        .unwrap();

    assert!(resumed.is_complete());
    assert_eq!(resumed.resumed_from, 50);
    assert_eq!(resumed.batches_uploaded, 2);
    assert!(!checkpoint_path.exists());

    let calls = store.add_calls();
    assert_eq!(calls[2][0], "chunk-50");

    // Every successful add across both runs, flattened: the full set, once each.
    let successful: Vec<String> = calls
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .flat_map(|(_, ids)| ids.clone())
        .collect();
    let expected: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
    assert_eq!(successful, expected);
    assert_eq!(store.stored_ids().len(), 130);
}

#[tokio::test]
async fn test_corrupt_checkpoint_stops_the_run() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let checkpoint_path = dir.path().join("checkpoint.txt");
    std::fs::write(&checkpoint_path, "not-a-number").unwrap();
    let store = MockVectorStore::new();

    let err = pipeline(Arc::new(store.clone()), checkpoint_path, 50)
        .upload_chunks(&numbered_chunks(10))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Checkpoint { .. }));
    assert!(store.add_calls().is_empty());
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let err = IngestionPipeline::new(
        TextSplitter::new(300, 50).unwrap(),
        0,
        Arc::new(MockEmbedder::new()),
        Arc::new(MockVectorStore::new()),
        FileCheckpoint::new("unused.txt"),
    )
    .unwrap_err();
    assert!(matches!(err, IngestError::InvalidBatchSize));
}

#[tokio::test]
async fn test_upload_all_from_records() {
    setup_tracing();
    let dir = tempdir().unwrap();
    let records: Vec<SourceRecord> = (0..4)
        .map(|i| SourceRecord {
            table: "argo_observations".to_string(),
            row: json!({ "float_id": 2902746, "cycle": i, "temperature": 28.0 + i as f64 })
                .as_object()
                .unwrap()
                .clone(),
        })
        .collect();
    let store = MockVectorStore::new();
    let pipeline = pipeline(Arc::new(store.clone()), dir.path().join("checkpoint.txt"), 3);

    let chunks = pipeline.chunk_records(&records);
    assert_eq!(chunks.len(), 4);
    assert!(chunks[0].content.starts_with("Table: argo_observations\nRow: {\"float_id\":2902746"));
    assert_eq!(chunks[2].metadata["row_index"], 2);

    let report = pipeline.upload_all(&records).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.total_chunks, 4);
    assert_eq!(store.add_calls().len(), 2);

    // Same records, same ids: a second full run overwrites.
    pipeline.upload_all(&records).await.unwrap();
    assert_eq!(store.stored_ids().len(), 4);
}

#[tokio::test]
async fn test_export_then_load_round_trip_through_guarded_reads() {
    setup_tracing();
    let fixture = ObservationDb::new().await.unwrap();
    let records = export_tables(&fixture.provider).await.unwrap();

    let observation_rows = records
        .iter()
        .filter(|r| r.table == "argo_observations")
        .count();
    assert_eq!(observation_rows, OBSERVATION_ROW_COUNT);
    assert_eq!(records[0].table, "argo_observations");
    assert_eq!(records[0].row.keys().next().map(String::as_str), Some("float_id"));

    let dir = tempdir().unwrap();
    let path = dir.path().join("output/argo_data.json");
    write_records(&path, &records).await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written[0]["table"], "argo_observations");
    assert_eq!(written[0]["row"]["float_id"], 2902746);

    let loaded = load_records(&path).await.unwrap();
    assert_eq!(loaded, records);

    let err = load_records(&dir.path().join("missing.json")).await.unwrap_err();
    assert!(matches!(err, IngestError::SourceNotFound(_)));
}
