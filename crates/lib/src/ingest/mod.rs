//! # Ingestion
//!
//! Offline population of the vector store: export table rows, turn them into
//! documents, split them into chunks, and upload the chunks in checkpointed batches.

pub mod checkpoint;
pub mod export;
pub mod pipeline;
pub mod splitter;

use thiserror::Error;

pub use checkpoint::FileCheckpoint;
pub use export::{export_tables, load_records, write_records};
pub use pipeline::{documents_from_records, BatchFailure, IngestionPipeline, UploadReport};
pub use splitter::TextSplitter;

/// Errors that stop an ingestion run before or between batches.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("The specified source could not be found: {0}")]
    SourceNotFound(String),

    #[error("Failed to parse the export: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("batch_size must be greater than zero")]
    InvalidBatchSize,

    #[error("Checkpoint file '{path}' is unreadable: {reason}")]
    Checkpoint { path: String, reason: String },

    #[error("Failed to upload batch {batch_number} starting at chunk {start_index}: {reason}")]
    Upload {
        batch_number: usize,
        start_index: usize,
        reason: String,
    },

    #[error("Failed to read the source database: {0}")]
    Storage(#[from] crate::errors::PromptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
