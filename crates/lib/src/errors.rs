use thiserror::Error;

/// Reasons the SQL guard refuses a model-generated statement.
///
/// A rejected statement is never handed to a [`Storage`](crate::providers::db::storage::Storage)
/// provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("The generated text was empty after cleaning.")]
    Empty,
    #[error("Only SELECT queries are allowed.")]
    NotSelectOnly { statement: String },
}

/// Errors raised by the user-facing answer paths (text-to-SQL and retrieval).
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("AI provider is not configured: {0}")]
    MissingAiProvider(String),
    #[error("Storage connection error: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("Vector store error: {0}")]
    VectorStore(String),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error(transparent)]
    Rejected(#[from] GuardError),
}

impl PromptError {
    /// True for failures of the chat or embedding model rather than of storage.
    pub fn is_generation_error(&self) -> bool {
        matches!(
            self,
            PromptError::AiRequest(_)
                | PromptError::AiDeserialization(_)
                | PromptError::AiApi(_)
                | PromptError::MissingAiProvider(_)
        )
    }
}
