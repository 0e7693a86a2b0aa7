use anyhow::Result;
use argo_rag::errors::PromptError;
use argo_rag::providers::ai::{AiProvider, Embedder};
use argo_rag::providers::db::{sqlite::SqliteProvider, storage::Storage};
use argo_rag::providers::vector::VectorStore;
use argo_rag::sql_guard::ValidatedSql;
use argo_rag::types::{Chunk, RetrievedChunk, Row};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Observation Database Fixture ---

/// Rows seeded into `argo_observations` by [`ObservationDb::new`].
pub const OBSERVATION_SEED_SQL: &str = "
    CREATE TABLE argo_observations (
        float_id INTEGER NOT NULL,
        cycle INTEGER NOT NULL,
        latitude REAL,
        longitude REAL,
        pressure REAL,
        temperature REAL,
        salinity REAL,
        observed_at TEXT
    );
    INSERT INTO argo_observations VALUES (2902746, 1, 12.51, 88.13, 5.0, 28.9, 33.8, '2023-03-01');
    INSERT INTO argo_observations VALUES (2902746, 1, 12.51, 88.13, 500.0, 9.7, 35.0, '2023-03-01');
    INSERT INTO argo_observations VALUES (2902746, 2, 12.62, 88.40, 5.0, 29.3, 33.6, '2023-03-11');
    INSERT INTO argo_observations VALUES (2902755, 7, -4.02, 71.95, 10.0, 27.4, 34.9, '2023-04-02');
    INSERT INTO argo_observations VALUES (2902755, 7, -4.02, 71.95, 1000.0, 5.6, 34.8, '2023-04-02');
    CREATE TABLE float_deployments (float_id INTEGER PRIMARY KEY, deployed_on TEXT, program TEXT);
    INSERT INTO float_deployments VALUES (2902746, '2022-11-20', 'INCOIS');
    INSERT INTO float_deployments VALUES (2902755, '2023-01-08', 'INCOIS');
";

pub const OBSERVATION_ROW_COUNT: usize = 5;
pub const DEPLOYMENT_ROW_COUNT: usize = 2;

/// An isolated in-memory observation database.
pub struct ObservationDb {
    pub provider: SqliteProvider,
}

impl ObservationDb {
    pub async fn new() -> Result<Self> {
        let provider = SqliteProvider::new(":memory:").await?;
        provider.initialize_with_data(OBSERVATION_SEED_SQL).await?;
        Ok(Self { provider })
    }
}

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((system_prompt.to_string(), user_prompt.to_string()));

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        Err(PromptError::AiApi(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}

// --- Counting Storage ---

/// A [`Storage`] that counts executions and delegates to an optional inner provider.
/// Without one, every query returns no rows.
#[derive(Clone, Debug)]
pub struct CountingStorage {
    inner: Option<Box<dyn Storage>>,
    executions: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn empty() -> Self {
        Self {
            inner: None,
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn wrapping(inner: Box<dyn Storage>) -> Self {
        Self {
            inner: Some(inner),
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for CountingStorage {
    fn name(&self) -> &str {
        "Counting"
    }

    async fn execute_select(&self, sql: &ValidatedSql) -> Result<Vec<Row>, PromptError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        match &self.inner {
            Some(inner) => inner.execute_select(sql).await,
            None => Ok(Vec::new()),
        }
    }

    async fn list_tables(&self) -> Result<Vec<String>, PromptError> {
        match &self.inner {
            Some(inner) => inner.list_tables().await,
            None => Ok(Vec::new()),
        }
    }
}

// --- Mock Embedder ---

/// Embeds text as letter frequencies, so texts sharing words land close together.
#[derive(Clone, Debug, Default)]
pub struct MockEmbedder {
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub const DIMENSIONS: usize = 27;

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed` and `embed_batch` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; Self::DIMENSIONS];
        for c in text.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_lowercase() {
                vector[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        // Keeps the vector non-zero for texts without letters.
        vector[Self::DIMENSIONS - 1] = 1.0;
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        vector.iter().map(|v| v / norm).collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-letter-frequency"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector_for(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, PromptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

// --- Mock Vector Store ---

#[derive(Debug, Default)]
struct MockVectorState {
    entries: Vec<(Chunk, Vec<f32>)>,
    add_calls: Vec<Vec<String>>,
    fail_on_call: Option<usize>,
}

/// An in-memory [`VectorStore`] that records every `add` call and can be told to
/// fail one of them.
#[derive(Clone, Debug)]
pub struct MockVectorStore {
    collection: String,
    state: Arc<Mutex<MockVectorState>>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self {
            collection: "mock_collection".to_string(),
            state: Arc::new(Mutex::new(MockVectorState::default())),
        }
    }

    /// Makes the `n`th `add` call (1-based, counted over the store's lifetime) fail.
    pub fn fail_on_call(&self, n: Option<usize>) {
        self.state.lock().unwrap().fail_on_call = n;
    }

    /// Chunk ids of every `add` call, including failed ones.
    pub fn add_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().add_calls.clone()
    }

    /// Ids currently stored, in first-insertion order.
    pub fn stored_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|(chunk, _)| chunk.id.clone())
            .collect()
    }

    /// Stores chunks directly, embedding them with [`MockEmbedder::vector_for`].
    pub fn seed(&self, chunks: Vec<Chunk>) {
        let mut state = self.state.lock().unwrap();
        for chunk in chunks {
            let vector = MockEmbedder::vector_for(&chunk.content);
            state.entries.push((chunk, vector));
        }
    }
}

impl Default for MockVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b)) as f64
}

#[async_trait]
impl VectorStore for MockVectorStore {
    fn name(&self) -> &str {
        "Mock"
    }

    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<(), PromptError> {
        let mut state = self.state.lock().unwrap();
        state
            .add_calls
            .push(chunks.iter().map(|c| c.id.clone()).collect());
        if state.fail_on_call == Some(state.add_calls.len()) {
            return Err(PromptError::VectorStore(
                "MockVectorStore: quota exceeded".to_string(),
            ));
        }
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            match state.entries.iter_mut().find(|(c, _)| c.id == chunk.id) {
                Some(entry) => *entry = (chunk.clone(), embedding.clone()),
                None => state.entries.push((chunk.clone(), embedding.clone())),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, PromptError> {
        let state = self.state.lock().unwrap();
        let mut ranked: Vec<RetrievedChunk> = state
            .entries
            .iter()
            .map(|(chunk, vector)| RetrievedChunk {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                distance: cosine_distance(embedding, vector),
            })
            .collect();
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        ranked.truncate(k);
        Ok(ranked)
    }
}

/// Builds a chunk with the given id and content and empty metadata.
pub fn chunk(id: &str, content: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        content: content.to_string(),
        metadata: serde_json::Map::new(),
    }
}
