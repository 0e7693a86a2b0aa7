pub mod embedding;
pub mod openai;

use crate::errors::PromptError;
use async_trait::async_trait;
use dyn_clone::DynClone;
pub use embedding::{ApiEmbedder, Embedder};
pub use openai::OpenAiProvider;
use std::fmt::Debug;

/// A trait for interacting with a chat-completion model.
///
/// The text-to-SQL path uses it twice per question: once to write the query and
/// once to summarize the rows.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// Generates a response from a given system and user prompt.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, PromptError>;
}

dyn_clone::clone_trait_object!(AiProvider);
