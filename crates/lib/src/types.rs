//! # Shared Data Types
//!
//! Records flowing between the exporter, the ingestion pipeline, the vector
//! stores and the two answer paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One observation row: column name to value, in the column order the engine returned.
pub type Row = Map<String, Value>;

/// A row as written by the table exporter: `{"table": ..., "row": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub table: String,
    pub row: Row,
}

/// A unit of retrievable text built from one [`SourceRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Renders a record as `Table: <name>\nRow: <row>` with the table name as metadata.
    pub fn from_record(record: &SourceRecord, row_index: usize) -> Self {
        let row_repr = Value::Object(record.row.clone()).to_string();
        let mut metadata = Map::new();
        metadata.insert("table".to_string(), Value::String(record.table.clone()));
        metadata.insert("row_index".to_string(), Value::from(row_index));
        Self {
            content: format!("Table: {}\nRow: {}", record.table, row_repr),
            metadata,
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.metadata.get("table").and_then(Value::as_str)
    }
}

/// A bounded slice of a [`Document`]'s content, ready for embedding and upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identity so that a re-sent batch overwrites instead of duplicating.
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
}

/// A chunk returned by a similarity query, in the order the store ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    /// Cosine distance reported by the store; lower is closer.
    pub distance: f64,
}

/// The full outcome of a text-to-SQL request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptResult {
    /// The plain-language answer returned to the caller.
    pub text: String,
    /// The statement as the model produced it, before cleaning.
    pub generated_sql: String,
    /// The payload handed to the summarization prompt.
    pub database_result: String,
}
