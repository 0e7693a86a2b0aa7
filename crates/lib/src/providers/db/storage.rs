use crate::{errors::PromptError, sql_guard::ValidatedSql, types::Row};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for the relational backend behind the text-to-SQL path.
///
/// Implementations acquire a connection for each call and release it before
/// returning, on success and on error alike. No connection state is shared
/// between calls.
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// Returns the name of the storage provider (e.g., "SQLite").
    fn name(&self) -> &str;

    /// Executes one guarded `SELECT` and returns every row keyed by column name,
    /// in the column order the engine reports. Row order is the engine's.
    async fn execute_select(&self, sql: &ValidatedSql) -> Result<Vec<Row>, PromptError>;

    /// Lists the user tables of the database.
    async fn list_tables(&self) -> Result<Vec<String>, PromptError>;
}

dyn_clone::clone_trait_object!(Storage);
