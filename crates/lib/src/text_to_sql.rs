//! # Natural Language to SQL
//!
//! The `PromptClient` turns a question into a SQL query with a chat model, runs the
//! query through the SQL guard and the storage provider, and asks the model again to
//! explain the rows.

use crate::{
    constants::DEFAULT_SOURCE_TABLE,
    errors::{GuardError, PromptError},
    prompts::core::{
        SQL_GENERATION_SYSTEM_PROMPT, SQL_GENERATION_USER_PROMPT, SUMMARY_SYSTEM_PROMPT,
        SUMMARY_USER_PROMPT,
    },
    providers::{ai::AiProvider, db::storage::Storage},
    sql_guard::clean_and_validate,
    types::{PromptResult, Row},
};
use regex::Regex;
use serde_json::{json, Value};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

/// `{question}` and `{results}` in the summary template. Substituted in one pass
/// so that neither value is expanded again.
fn placeholder_re() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE
        .get_or_init(|| Regex::new(r"\{(question|results)\}").expect("valid placeholder regex"))
}

/// The result of routing generated SQL through the guard and the executor.
///
/// Rejections and failures are data here: they still go to the summarization
/// prompt so the caller always gets an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Rejected(GuardError),
    Failed(String),
}

impl QueryOutcome {
    /// Renders the outcome the way the summarization prompt receives it: a JSON array
    /// of rows, or `{"error": "..."}`.
    pub fn to_prompt_payload(&self) -> String {
        match self {
            QueryOutcome::Rows(rows) => Value::Array(
                rows.iter().cloned().map(Value::Object).collect::<Vec<_>>(),
            )
            .to_string(),
            QueryOutcome::Rejected(e) => json!({ "error": e.to_string() }).to_string(),
            QueryOutcome::Failed(message) => json!({ "error": message }).to_string(),
        }
    }
}

/// A client that answers questions about one table with two chat-model calls.
pub struct PromptClient {
    pub ai_provider: Box<dyn AiProvider>,
    pub storage_provider: Box<dyn Storage>,
    pub(crate) table_name: String,
    pub(crate) query_system_prompt: String,
    pub(crate) query_user_prompt: String,
    pub(crate) summary_system_prompt: String,
    pub(crate) summary_user_prompt: String,
}

impl fmt::Debug for PromptClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptClient")
            .field("ai_provider", &self.ai_provider)
            .field("storage_provider", &self.storage_provider)
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl PromptClient {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Answers `question` in plain language.
    ///
    /// A failure of either model call is returned as an error. Guard rejections and
    /// database errors are not: they are summarized like any other result.
    pub async fn answer(&self, question: &str) -> Result<PromptResult, PromptError> {
        info!("[answer] received question: {question:?}");

        let generated_sql = self.generate_sql(question).await?;
        let outcome = self.run_generated_sql(&generated_sql).await;
        let database_result = outcome.to_prompt_payload();

        let text = self.summarize(question, &database_result).await?;
        Ok(PromptResult {
            text,
            generated_sql,
            database_result,
        })
    }

    /// Asks the model for a single SELECT against the configured table.
    pub async fn generate_sql(&self, question: &str) -> Result<String, PromptError> {
        let system_prompt = self
            .query_system_prompt
            .replace("{table_name}", &self.table_name);
        let user_prompt = self.query_user_prompt.replace("{question}", question);

        debug!(system_prompt = %system_prompt, user_prompt = %user_prompt, "--> Sending prompts to AI Provider");
        let raw_response = self
            .ai_provider
            .generate(&system_prompt, &user_prompt)
            .await?;
        let generated_sql = raw_response.trim().to_string();
        info!("Generated SQL: {generated_sql}");
        Ok(generated_sql)
    }

    /// Guards and executes model output. Never returns an error.
    pub async fn run_generated_sql(&self, generated_sql: &str) -> QueryOutcome {
        let validated = match clean_and_validate(generated_sql) {
            Ok(validated) => validated,
            Err(e) => {
                warn!("[run_generated_sql] rejected generated SQL: {e}");
                return QueryOutcome::Rejected(e);
            }
        };

        match self.storage_provider.execute_select(&validated).await {
            Ok(rows) => QueryOutcome::Rows(rows),
            Err(e) => {
                error!("[run_generated_sql] Query execution error: {e:?}");
                QueryOutcome::Failed(e.to_string())
            }
        }
    }

    async fn summarize(&self, question: &str, results: &str) -> Result<String, PromptError> {
        let user_prompt = placeholder_re()
            .replace_all(&self.summary_user_prompt, |caps: &regex::Captures| {
                match &caps[1] {
                    "question" => question,
                    _ => results,
                }
                .to_string()
            })
            .into_owned();

        debug!(system_prompt = %self.summary_system_prompt, user_prompt = %user_prompt, "--> Sending prompts to AI Provider for summarization");
        self.ai_provider
            .generate(&self.summary_system_prompt, &user_prompt)
            .await
    }
}

/// A builder for creating `PromptClient` instances.
#[derive(Default)]
pub struct PromptClientBuilder {
    ai_provider: Option<Box<dyn AiProvider>>,
    storage_provider: Option<Box<dyn Storage>>,
    table_name: Option<String>,
    query_system_prompt: Option<String>,
    query_user_prompt: Option<String>,
    summary_system_prompt: Option<String>,
    summary_user_prompt: Option<String>,
}

impl PromptClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ai_provider(mut self, ai_provider: Box<dyn AiProvider>) -> Self {
        self.ai_provider = Some(ai_provider);
        self
    }

    pub fn storage_provider(mut self, storage_provider: Box<dyn Storage>) -> Self {
        self.storage_provider = Some(storage_provider);
        self
    }

    /// The table named in the generation prompt. Defaults to `argo_observations`.
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Overrides the generation system prompt. `{table_name}` is substituted.
    pub fn query_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.query_system_prompt = Some(prompt.into());
        self
    }

    /// Overrides the generation user prompt. `{question}` is substituted.
    pub fn query_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.query_user_prompt = Some(prompt.into());
        self
    }

    pub fn summary_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.summary_system_prompt = Some(prompt.into());
        self
    }

    /// Overrides the summarization user prompt. `{question}` and `{results}` are substituted.
    pub fn summary_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.summary_user_prompt = Some(prompt.into());
        self
    }

    /// Builds the `PromptClient`, failing if either provider is missing.
    pub fn build(self) -> Result<PromptClient, PromptError> {
        let ai_provider = self.ai_provider.ok_or_else(|| {
            PromptError::MissingAiProvider("no chat provider was configured".to_string())
        })?;
        let storage_provider = self.storage_provider.ok_or_else(|| {
            PromptError::StorageConnection("no storage provider was configured".to_string())
        })?;

        Ok(PromptClient {
            ai_provider,
            storage_provider,
            table_name: self
                .table_name
                .unwrap_or_else(|| DEFAULT_SOURCE_TABLE.to_string()),
            query_system_prompt: self
                .query_system_prompt
                .unwrap_or_else(|| SQL_GENERATION_SYSTEM_PROMPT.to_string()),
            query_user_prompt: self
                .query_user_prompt
                .unwrap_or_else(|| SQL_GENERATION_USER_PROMPT.to_string()),
            summary_system_prompt: self
                .summary_system_prompt
                .unwrap_or_else(|| SUMMARY_SYSTEM_PROMPT.to_string()),
            summary_user_prompt: self
                .summary_user_prompt
                .unwrap_or_else(|| SUMMARY_USER_PROMPT.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_payloads() {
        let mut row = Row::new();
        row.insert("depth".to_string(), json!(1950.5));
        assert_eq!(
            QueryOutcome::Rows(vec![row]).to_prompt_payload(),
            r#"[{"depth":1950.5}]"#
        );
        assert_eq!(QueryOutcome::Rows(vec![]).to_prompt_payload(), "[]");
        assert_eq!(
            QueryOutcome::Rejected(GuardError::NotSelectOnly {
                statement: "DROP TABLE t".to_string()
            })
            .to_prompt_payload(),
            r#"{"error":"Only SELECT queries are allowed."}"#
        );
        assert_eq!(
            QueryOutcome::Failed("no such table: x".to_string()).to_prompt_payload(),
            r#"{"error":"no such table: x"}"#
        );
    }
}
