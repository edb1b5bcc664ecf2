// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end memory and RAG tests.
//!
//! `TestHarness` assembles the full stack (temp SQLite database, memory
//! store, pipeline) over mock adapters.

use std::sync::Arc;

use abel_config::model::MemoryConfig;
use abel_core::AbelError;
use abel_memory::{MemoryStore, RagPipeline, RagResponse, SqliteBackend};
use abel_storage::Database;

use crate::flaky_backend::FlakyBackend;
use crate::mock_embedder::MockEmbedder;
use crate::mock_provider::MockProvider;

const DEFAULT_DIMENSIONS: usize = 64;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    memory: MemoryConfig,
    persona: String,
    dimensions: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            memory: MemoryConfig::default(),
            persona: "You are a test assistant.".to_string(),
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Set mock provider responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_memory_config(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Build the harness on a fresh on-disk database.
    pub async fn build(self) -> Result<TestHarness, AbelError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| AbelError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let database = Database::open(&db_path.to_string_lossy(), true).await?;

        let backend = Arc::new(FlakyBackend::new(SqliteBackend::new(database.clone())));
        let embedder = Arc::new(MockEmbedder::new(self.dimensions));
        let provider = Arc::new(MockProvider::with_responses(self.responses));
        let store = Arc::new(MemoryStore::new(backend.clone(), embedder.clone()));
        let pipeline = RagPipeline::new(store.clone(), provider.clone(), self.persona, self.memory);

        Ok(TestHarness {
            database,
            backend,
            embedder,
            provider,
            store,
            pipeline,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// Database handle (temp file, removed on drop).
    pub database: Database,
    /// Backend with switchable failures.
    pub backend: Arc<FlakyBackend>,
    pub embedder: Arc<MockEmbedder>,
    pub provider: Arc<MockProvider>,
    pub store: Arc<MemoryStore>,
    pub pipeline: RagPipeline,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one context-aware generation without history.
    pub async fn chat(&self, user_id: &str, message: &str) -> Result<RagResponse, AbelError> {
        self.pipeline.generate_with_context(user_id, message, None).await
    }
}
