//! # Text-to-SQL Prompt Templates
//!
//! Templates for the two model calls of the text-to-SQL path. They can be
//! overridden per client through `PromptClientBuilder`.

// --- Query Generation Prompts ---

/// The system prompt for the query generation stage.
///
/// Placeholders: `{table_name}`
pub const SQL_GENERATION_SYSTEM_PROMPT: &str = "You are an expert SQL assistant. only Generate a SELECT query for the {table_name} table and nothing else.";

/// The user prompt for the query generation stage.
///
/// Placeholders: `{question}`
pub const SQL_GENERATION_USER_PROMPT: &str = "Write a SQL query to answer: {question}";

// --- Result Summarization Prompts ---

/// The system prompt for the summarization stage.
pub const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that explains database results.";

/// The user prompt for the summarization stage.
///
/// Placeholders: `{question}`, `{results}`
pub const SUMMARY_USER_PROMPT: &str =
    "Question: {question}\nResults: {results}\nSummarize the results in plain English.";
