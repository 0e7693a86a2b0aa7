//! # Application Configuration
//!
//! One flat configuration shared by the server and the CLI. Values come from, in
//! increasing priority: built-in defaults, an optional `config.yml` (with `${VAR}`
//! substitution), plain environment variables such as `CHUNK_SIZE`, and
//! `ARGO_RAG_`-prefixed variables.

use crate::constants::*;
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "config.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// Where ingested chunks are stored and searched.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Sqlite,
    Chroma,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the SQLite observation database.
    #[serde(default = "default_database_uri")]
    pub database_uri: String,
    /// The only table the text-to-SQL path generates queries for.
    #[serde(default = "default_source_table")]
    pub source_table: String,
    /// Holds the table export and the upload checkpoint.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Attempts made by the completion client before giving up.
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default)]
    pub perplexity_api_key: Option<String>,
    #[serde(default = "default_perplexity_api_url")]
    pub perplexity_api_url: String,
    #[serde(default = "default_perplexity_model")]
    pub perplexity_model: String,

    #[serde(default = "default_embeddings_api_url")]
    pub embeddings_api_url: String,
    #[serde(default)]
    pub embeddings_api_key: Option<String>,
    #[serde(default = "default_embeddings_model")]
    pub embeddings_model: String,

    #[serde(default)]
    pub vector_backend: VectorBackend,
    /// Path of the SQLite vector store. Unused with the Chroma backend.
    #[serde(default = "default_vector_db_url")]
    pub vector_db_url: String,
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    #[serde(default = "default_chroma_api_url")]
    pub chroma_api_url: String,
    #[serde(default)]
    pub chroma_api_key: Option<String>,
    #[serde(default = "default_chroma_tenant")]
    pub chroma_tenant: String,
    #[serde(default = "default_chroma_database")]
    pub chroma_database: String,

    /// Comma separated list of origins allowed to call the HTTP API.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: String,
}

fn default_port() -> u16 {
    8000
}
fn default_database_uri() -> String {
    DEFAULT_DB_FILE.to_string()
}
fn default_source_table() -> String {
    DEFAULT_SOURCE_TABLE.to_string()
}
fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_retries() -> u32 {
    DEFAULT_RETRIES
}
fn default_backoff_ms() -> u64 {
    DEFAULT_BACKOFF_MS
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_openai_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_perplexity_api_url() -> String {
    "https://api.perplexity.ai/chat/completions".to_string()
}
fn default_perplexity_model() -> String {
    "sonar-pro".to_string()
}
fn default_embeddings_api_url() -> String {
    "http://localhost:8080/v1/embeddings".to_string()
}
fn default_embeddings_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}
fn default_vector_db_url() -> String {
    DEFAULT_VECTOR_DB_FILE.to_string()
}
fn default_collection_name() -> String {
    DEFAULT_COLLECTION_NAME.to_string()
}
fn default_chroma_api_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_chroma_tenant() -> String {
    crate::providers::vector::chroma::DEFAULT_TENANT.to_string()
}
fn default_chroma_database() -> String {
    crate::providers::vector::chroma::DEFAULT_DATABASE.to_string()
}
fn default_cors_allowed_origins() -> String {
    "http://localhost:3000,https://floatchat-delta.vercel.app,http://localhost:5173".to_string()
}

impl AppConfig {
    /// Checks the invariants the pipeline and the retrieval path depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "BATCH_SIZE must be greater than zero".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(ConfigError::Invalid(
                "TOP_K must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn export_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(EXPORT_FILE_NAME)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(CHECKPOINT_FILE_NAME)
    }

    /// `${VAR}` placeholders for unset variables become empty strings; treat those
    /// keys as absent.
    fn drop_empty_keys(&mut self) {
        for key in [
            &mut self.openai_api_key,
            &mut self.perplexity_api_key,
            &mut self.embeddings_api_key,
            &mut self.chroma_api_key,
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *key = None;
            }
        }
    }
}

// Reads a file and replaces `${VAR}` with the variable's value, or nothing.
// Returns Ok(None) if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}")
        .map_err(|e| ConfigError::General(e.to_string()))?;
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        env::var(&caps["var"]).unwrap_or_default()
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads and validates the configuration.
///
/// `config_path_override` names a YAML file that must exist. Without it,
/// `config.yml` in the working directory is used if present.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let config_path = config_path_override.unwrap_or(DEFAULT_CONFIG_FILE);
    match read_and_substitute(config_path)? {
        Some(content) => {
            info!("Loading configuration from '{config_path}'.");
            builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
        }
        None if config_path_override.is_some() => {
            return Err(ConfigError::General(format!(
                "Config file not found at '{config_path}'"
            )));
        }
        None => {}
    }

    let settings = builder
        // Top-level keys like CHUNK_SIZE.
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("ARGO_RAG")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;
    config.drop_empty_keys();
    config.validate()?;
    Ok(config)
}
