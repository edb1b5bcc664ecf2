// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the runtime stack from configuration.

use std::sync::Arc;
use std::time::Duration;

use abel_config::model::{AbelConfig, AssistantConfig, GeminiConfig};
use abel_core::{AbelError, EmbeddingAdapter, PluginAdapter, ProviderAdapter};
use abel_gemini::{GeminiEmbedder, GeminiProvider};
use abel_memory::prompt::default_persona;
use abel_memory::{MemoryBackend, MemoryStore, RagPipeline, SqliteBackend};
use abel_storage::Database;
use tracing::{debug, info, warn};

/// The assembled stack shared by all commands.
pub struct App {
    pub config: AbelConfig,
    pub store: Arc<MemoryStore>,
    pub pipeline: RagPipeline,
    backend: Arc<SqliteBackend>,
}

impl App {
    /// Opens the database and connects the Gemini adapters.
    pub async fn init(config: AbelConfig) -> Result<Self, AbelError> {
        let database = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
        let backend = Arc::new(SqliteBackend::new(database));

        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(GeminiEmbedder::new(&config.gemini)?);
        let provider: Arc<dyn ProviderAdapter> = Arc::new(GeminiProvider::new(&config.gemini)?);

        let embed_timeout = embed_call_timeout(&config.gemini);
        let store = Arc::new(
            MemoryStore::new(backend.clone() as Arc<dyn MemoryBackend>, embedder)
                .with_embed_timeout(embed_timeout),
        );

        let persona = resolve_persona(&config.assistant)?;
        let pipeline = RagPipeline::new(store.clone(), provider, persona, config.memory.clone())
            .with_generation_timeout(Duration::from_secs(config.gemini.generation_timeout_secs));

        info!(
            database = config.storage.database_path,
            memory_enabled = config.memory.enabled,
            "abel initialized"
        );
        Ok(Self {
            config,
            store,
            pipeline,
            backend,
        })
    }

    /// Checkpoints and closes the database.
    pub async fn shutdown(&self) {
        if let Err(e) = self.backend.shutdown().await {
            warn!(error = %e, "database shutdown failed");
        }
    }
}

/// Persona text: `system_prompt_file` wins over `system_prompt`, which wins
/// over the built-in persona.
pub fn resolve_persona(assistant: &AssistantConfig) -> Result<String, AbelError> {
    if let Some(path) = &assistant.system_prompt_file {
        debug!(path, "loading persona from file");
        let text = std::fs::read_to_string(path).map_err(|e| {
            AbelError::Config(format!("cannot read system_prompt_file {path}: {e}"))
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AbelError::Config(format!("system_prompt_file {path} is empty")));
        }
        return Ok(text.to_string());
    }
    match assistant.system_prompt.as_deref().map(str::trim) {
        Some(prompt) if !prompt.is_empty() => Ok(prompt.to_string()),
        _ => Ok(default_persona(&display_name(&assistant.name))),
    }
}

/// Capitalizes the configured name for use in prose.
/// Bound on one whole embedding call, retries included.
fn embed_call_timeout(gemini: &GeminiConfig) -> Duration {
    let attempts = gemini.max_retries.saturating_add(1);
    Duration::from_secs(gemini.embed_timeout_secs).saturating_mul(attempts)
}

fn display_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
