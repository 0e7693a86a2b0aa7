//! # Table Export
//!
//! Dumps every user table of a relational source into the JSON file the upload
//! step reads: `[{"table": "...", "row": {...}}, ...]`.

use super::IngestError;
use crate::{
    providers::db::{sqlite::sql::select_all_from, storage::Storage},
    sql_guard::clean_and_validate,
    types::{Row, SourceRecord},
};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// Reads every row of every user table through the guarded executor.
///
/// A table that cannot be read is skipped with a warning; the export goes on.
pub async fn export_tables(storage: &dyn Storage) -> Result<Vec<SourceRecord>, IngestError> {
    let tables = storage.list_tables().await?;
    info!("Exporting {} tables from {}", tables.len(), storage.name());

    let mut records = Vec::new();
    for table in tables {
        let rows = match read_table(storage, &table).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Could not read table '{table}': {e}");
                continue;
            }
        };
        info!("Exported {} rows from '{table}'", rows.len());
        records.extend(rows.into_iter().map(|row| SourceRecord {
            table: table.clone(),
            row,
        }));
    }
    Ok(records)
}

async fn read_table(storage: &dyn Storage, table: &str) -> Result<Vec<Row>, IngestError> {
    let validated =
        clean_and_validate(&select_all_from(table)).map_err(crate::errors::PromptError::from)?;
    Ok(storage.execute_select(&validated).await?)
}

/// Writes `records` as pretty-printed JSON, creating parent directories.
pub async fn write_records(path: &Path, records: &[SourceRecord]) -> Result<(), IngestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).await?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Loads an export written by [`write_records`].
pub async fn load_records(path: &Path) -> Result<Vec<SourceRecord>, IngestError> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::SourceNotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    let records: Vec<SourceRecord> = serde_json::from_str(&content)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_export_is_source_not_found() {
        let dir = tempdir().unwrap();
        let err = load_records(&dir.path().join("argo_data.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_export_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("argo_data.json");
        std::fs::write(&path, r#"[{"table": "t"}]"#).unwrap();
        let err = load_records(&path).await.unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }
}
