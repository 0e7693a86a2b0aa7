//! # Checkpointed Upload
//!
//! Records become documents, documents become chunks, and chunks are embedded and
//! written to the vector store in fixed-size batches. After every stored batch the
//! index of the next chunk is saved, so a halted run resumes where it stopped.
//!
//! A batch is marked done only after the store accepts it. If the process dies after
//! the store accepted a batch but before the checkpoint was written, that batch is
//! sent again on resume; chunk ids are deterministic and stores upsert by id, so the
//! resend overwrites rather than duplicates.
//!
//! Only one upload may run against a checkpoint file at a time. Nothing here locks
//! the file.

use super::{checkpoint::FileCheckpoint, splitter::TextSplitter, IngestError};
use crate::{
    providers::{ai::Embedder, vector::VectorStore},
    types::{Chunk, Document, SourceRecord},
};
use std::sync::Arc;
use tracing::{error, info};

/// The batch that stopped an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// 1-based, counted from the first chunk of the collection.
    pub batch_number: usize,
    pub start_index: usize,
    pub reason: String,
}

impl BatchFailure {
    pub fn into_error(self) -> IngestError {
        IngestError::Upload {
            batch_number: self.batch_number,
            start_index: self.start_index,
            reason: self.reason,
        }
    }
}

/// What one call to [`IngestionPipeline::upload_all`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub total_chunks: usize,
    /// The chunk index this run started from.
    pub resumed_from: usize,
    /// The index of the first chunk not yet stored.
    pub next_index: usize,
    pub batches_uploaded: usize,
    pub failure: Option<BatchFailure>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.next_index >= self.total_chunks
    }
}

/// Turns exported records into documents, numbering rows in export order.
pub fn documents_from_records(records: &[SourceRecord]) -> Vec<Document> {
    records
        .iter()
        .enumerate()
        .map(|(row_index, record)| Document::from_record(record, row_index))
        .collect()
}

#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    splitter: TextSplitter,
    batch_size: usize,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    checkpoint: FileCheckpoint,
}

impl IngestionPipeline {
    pub fn new(
        splitter: TextSplitter,
        batch_size: usize,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        checkpoint: FileCheckpoint,
    ) -> Result<Self, IngestError> {
        if batch_size == 0 {
            return Err(IngestError::InvalidBatchSize);
        }
        Ok(Self {
            splitter,
            batch_size,
            embedder,
            store,
            checkpoint,
        })
    }

    pub fn checkpoint(&self) -> &FileCheckpoint {
        &self.checkpoint
    }

    /// Splits every record into chunks, in the order they will be uploaded.
    pub fn chunk_records(&self, records: &[SourceRecord]) -> Vec<Chunk> {
        self.splitter
            .split_documents(&documents_from_records(records))
    }

    /// Chunks `records` and uploads every chunk past the checkpoint.
    ///
    /// A failed batch is not an `Err`: the loop stops, the checkpoint is left at the
    /// last stored batch and the report carries the failure. Errors are reserved for
    /// an unreadable or unwritable checkpoint.
    pub async fn upload_all(&self, records: &[SourceRecord]) -> Result<UploadReport, IngestError> {
        let chunks = self.chunk_records(records);
        info!(
            "Split {} records into {} chunks (size {}, overlap {})",
            records.len(),
            chunks.len(),
            self.splitter.chunk_size(),
            self.splitter.chunk_overlap()
        );
        self.upload_chunks(&chunks).await
    }

    /// Uploads already split chunks, resuming from the checkpoint.
    pub async fn upload_chunks(&self, chunks: &[Chunk]) -> Result<UploadReport, IngestError> {
        let total_chunks = chunks.len();
        let resumed_from = self.checkpoint.load().await?;
        let mut report = UploadReport {
            total_chunks,
            resumed_from,
            next_index: resumed_from,
            batches_uploaded: 0,
            failure: None,
        };

        if resumed_from >= total_chunks {
            info!("Checkpoint {resumed_from} covers all {total_chunks} chunks; nothing to upload");
            report.next_index = total_chunks;
            self.checkpoint.clear().await?;
            return Ok(report);
        }

        for start in (resumed_from..total_chunks).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(total_chunks);
            let batch = &chunks[start..end];
            let batch_number = start / self.batch_size + 1;

            if let Err(e) = self.store_batch(batch).await {
                error!("Upload failed at batch {batch_number} (chunks {start}..{end}): {e}");
                info!("Progress saved; re-run to resume from chunk {start}");
                report.failure = Some(BatchFailure {
                    batch_number,
                    start_index: start,
                    reason: e.to_string(),
                });
                return Ok(report);
            }

            self.checkpoint.save(end).await?;
            report.next_index = end;
            report.batches_uploaded += 1;
            info!("Uploaded batch {batch_number} ({end}/{total_chunks} chunks)");
        }

        self.checkpoint.clear().await?;
        info!(
            "All {total_chunks} chunks uploaded to '{}' on {}",
            self.store.collection(),
            self.store.name()
        );
        Ok(report)
    }

    async fn store_batch(&self, batch: &[Chunk]) -> Result<(), crate::errors::PromptError> {
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        self.store.add(batch, &embeddings).await
    }
}
