//! # Shared Constants
//!
//! Names, defaults and fixed response texts shared by the library, the server
//! and the CLI.

/// The relational table the text-to-SQL path is allowed to target.
pub const DEFAULT_SOURCE_TABLE: &str = "argo_observations";

/// The vector store collection holding ingested chunks.
pub const DEFAULT_COLLECTION_NAME: &str = "argo_collection";

/// The default path for the relational observation database.
pub const DEFAULT_DB_FILE: &str = "db/argo.db";

/// The default path for the SQLite-backed vector store.
pub const DEFAULT_VECTOR_DB_FILE: &str = "db/argo_vectors.db";

/// The default directory for exports and the upload checkpoint.
pub const DEFAULT_OUTPUT_DIR: &str = "./output";

/// The file name of the table export inside the output directory.
pub const EXPORT_FILE_NAME: &str = "argo_data.json";

/// The file name of the upload checkpoint inside the output directory.
pub const CHECKPOINT_FILE_NAME: &str = "chroma_upload_checkpoint.txt";

pub const DEFAULT_CHUNK_SIZE: usize = 300;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Kept small to stay below hosted vector store write quotas.
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 2000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Returned by the retrieval path when the store yields no chunks.
pub const NO_DOCUMENTS_FOUND: &str = "No relevant documents found.";

/// Returned by the completion client when a well-formed response has no choices.
pub const UNEXPECTED_RESPONSE_FORMAT: &str = "[ERROR] Unexpected response format";

/// Returned by the completion client when every attempt failed.
pub const FAILED_AFTER_RETRIES: &str = "[ERROR] Failed after retries";
