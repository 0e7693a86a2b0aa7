//! # ARGO Observation Q&A
//!
//! Answers natural-language questions about ARGO float observations in two ways:
//! by having a chat model write a guarded SQL `SELECT` and explain the rows, or by
//! retrieving exported rows from a vector store and handing them to a completion
//! model as context. The crate also holds the offline pipeline that fills the
//! vector store.

pub mod completion;
pub mod config;
pub mod constants;
pub mod errors;
pub mod ingest;
pub mod prompts;
pub mod providers;
pub mod retrieval;
pub mod sql_guard;
pub mod text_to_sql;
pub mod types;

pub use completion::{CompletionClient, CompletionOutcome};
pub use errors::{GuardError, PromptError};
pub use ingest::{IngestError, IngestionPipeline, UploadReport};
pub use retrieval::{RagQueryEngine, RetrievalAnswer};
pub use sql_guard::{clean_and_validate, ValidatedSql};
pub use text_to_sql::{PromptClient, PromptClientBuilder, QueryOutcome};
pub use types::{Chunk, Document, PromptResult, RetrievedChunk, Row, SourceRecord};
