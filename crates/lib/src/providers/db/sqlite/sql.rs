//! # SQLite Specific SQL Queries
//!
//! SQL strings for the SQLite providers, kept apart from the provider logic.

/// Lists user tables, skipping SQLite's internal ones.
pub const LIST_USER_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name;";

/// Builds a full-table read for the exporter. The name is double-quoted so that
/// table names with spaces survive.
pub fn select_all_from(table: &str) -> String {
    format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""))
}

/// Creates the table backing the SQLite vector store.
pub const CREATE_VECTOR_CHUNKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS vector_chunks (
    id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB NOT NULL
)";

/// Inserts a chunk, replacing any earlier upload of the same id.
pub const UPSERT_VECTOR_CHUNK: &str = "INSERT INTO vector_chunks (id, collection, content, metadata, embedding)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(id) DO UPDATE SET
        collection = excluded.collection,
        content = excluded.content,
        metadata = excluded.metadata,
        embedding = excluded.embedding";

/// Returns the nearest chunks of one collection by cosine distance.
///
/// Turso's vector functions expect the query vector as a literal within the query,
/// so the caller renders it with `vector32('[...]')`. Expects the collection
/// name as `?1`.
pub fn nearest_chunks(vector_literal: &str, limit: usize) -> String {
    format!(
        "SELECT id, content, metadata, vector_distance_cos(embedding, {vector_literal}) AS distance
         FROM vector_chunks
         WHERE collection = ?1
         ORDER BY distance ASC
         LIMIT {limit};"
    )
}

/// Counts stored chunks of one collection (`?1`).
pub const COUNT_COLLECTION_CHUNKS: &str =
    "SELECT COUNT(*) FROM vector_chunks WHERE collection = ?1";
