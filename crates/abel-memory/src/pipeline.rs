// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context-aware generation.
//!
//! One call runs retrieval, generation, access bookkeeping, extraction and
//! persistence, in that order. Only generation can fail the call: retrieval
//! errors degrade to a context-free prompt, and bookkeeping, extraction and
//! persistence failures are logged and absorbed.

use std::sync::Arc;
use std::time::Duration;

use abel_config::model::MemoryConfig;
use abel_core::{AbelError, ChatTurn, GenerationRequest, ProviderAdapter};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::extractor::LearningExtractor;
use crate::prompt::build_system_instruction;
use crate::retriever::ContextRetriever;
use crate::store::MemoryStore;
use crate::types::{
    validate_user_id, LearningCandidate, Metadata, NewMemory, RagContext, RagResponse,
};

/// Default bound on the main generation call.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Retrieval-augmented generation over a user's memories.
pub struct RagPipeline {
    store: Arc<MemoryStore>,
    retriever: ContextRetriever,
    extractor: LearningExtractor,
    provider: Arc<dyn ProviderAdapter>,
    persona: String,
    config: MemoryConfig,
    generation_timeout: Duration,
}

impl RagPipeline {
    pub fn new(
        store: Arc<MemoryStore>,
        provider: Arc<dyn ProviderAdapter>,
        persona: impl Into<String>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            retriever: ContextRetriever::new(store.clone(), config.clone()),
            extractor: LearningExtractor::new(provider.clone(), config.max_learnings_per_turn),
            store,
            provider,
            persona: persona.into(),
            config,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// The persona used as the base system instruction.
    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Generates a reply to `message` personalized with `user_id`'s memories.
    ///
    /// Returns [`AbelError::ProviderUnavailable`] when generation fails.
    pub async fn generate_with_context(
        &self,
        user_id: &str,
        message: &str,
        history: Option<Vec<ChatTurn>>,
    ) -> Result<RagResponse, AbelError> {
        validate_user_id(user_id)?;
        if message.trim().is_empty() {
            return Err(AbelError::validation("message", "must not be empty"));
        }
        let history = history.unwrap_or_default();

        if !self.config.enabled {
            let response = self.generate(&self.persona, message, history).await?;
            return Ok(RagResponse {
                response,
                context_used: Vec::new(),
                new_learnings: Vec::new(),
            });
        }

        let context = match self
            .retriever
            .retrieve_context(user_id, message, self.config.retrieval_limit)
            .await
        {
            Ok(context) => context,
            Err(e) => {
                warn!(user_id, error = %e, "context retrieval failed, answering without memories");
                let response = self.generate(&self.persona, message, history).await?;
                return Ok(RagResponse {
                    response,
                    context_used: Vec::new(),
                    new_learnings: Vec::new(),
                });
            }
        };

        let instruction = build_system_instruction(&self.persona, &context);
        let response = self.generate(&instruction, message, history).await?;

        self.record_access(&context).await;
        let new_learnings = if self.config.extract_learnings {
            self.learn(user_id, message, &response).await
        } else {
            Vec::new()
        };

        Ok(RagResponse {
            response,
            context_used: context
                .memories
                .iter()
                .map(|m| m.entry.content.clone())
                .collect(),
            new_learnings,
        })
    }

    async fn generate(
        &self,
        system_instruction: &str,
        message: &str,
        history: Vec<ChatTurn>,
    ) -> Result<String, AbelError> {
        let request = GenerationRequest::new(message)
            .with_system_instruction(system_instruction)
            .with_history(history);

        match tokio::time::timeout(self.generation_timeout, self.provider.generate(request)).await
        {
            Ok(Ok(response)) => {
                debug!(model = %response.model, "generation complete");
                Ok(response.text)
            }
            Ok(Err(e @ AbelError::ProviderUnavailable { .. })) => Err(e),
            Ok(Err(e)) => Err(AbelError::ProviderUnavailable {
                message: format!("generation failed: {e}"),
                source: Some(Box::new(e)),
            }),
            Err(_) => Err(AbelError::provider(format!(
                "generation timed out after {:?}",
                self.generation_timeout
            ))),
        }
    }

    async fn record_access(&self, context: &RagContext) {
        for memory in &context.memories {
            if let Err(e) = self.store.increment_access(&memory.entry.id).await {
                warn!(memory_id = %memory.entry.id, error = %e, "failed to record memory access");
            }
        }
    }

    /// Extracts and persists learnings; returns the ones actually stored.
    ///
    /// Extraction and persistence share one deadline. Learnings not stored
    /// by then are dropped.
    async fn learn(&self, user_id: &str, message: &str, response: &str) -> Vec<LearningCandidate> {
        let timeout = Duration::from_secs(self.config.extraction_timeout_secs);
        let deadline = Instant::now() + timeout;
        let candidates = match tokio::time::timeout_at(
            deadline,
            self.extractor.extract_learnings(message, response),
        )
        .await
        {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                warn!(user_id, error = %e, "learning extraction failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(user_id, ?timeout, "learning extraction timed out");
                return Vec::new();
            }
        };

        let mut stored = Vec::new();
        for candidate in candidates {
            let memory = NewMemory::new(candidate.category, candidate.content.clone())
                .with_importance(candidate.importance)
                .with_metadata(learning_metadata());
            let persisted = tokio::time::timeout_at(
                deadline,
                self.store
                    .store_unless_duplicate(user_id, memory, self.config.dedup_threshold),
            )
            .await;
            match persisted {
                Ok(Ok(Some(entry))) => {
                    info!(user_id, memory_id = %entry.id, "learned new memory");
                    stored.push(candidate);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => warn!(user_id, error = %e, "failed to persist learning"),
                Err(_) => {
                    warn!(user_id, ?timeout, stored = stored.len(), "persisting learnings timed out");
                    break;
                }
            }
        }
        stored
    }
}

fn learning_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), Value::from("conversation"));
    metadata.insert("auto_extracted".into(), Value::from(true));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::types::{MemoryCategory, SearchQuery};
    use abel_core::ChatRole;
    use abel_storage::Database;
    use abel_test_utils::{MockEmbedder, MockProvider};
    use tracing_test::traced_test;

    struct Fixture {
        store: Arc<MemoryStore>,
        embedder: Arc<MockEmbedder>,
        provider: Arc<MockProvider>,
        pipeline: RagPipeline,
    }

    async fn fixture(config: MemoryConfig) -> Fixture {
        let backend = SqliteBackend::new(Database::open_in_memory().await.unwrap());
        let embedder = Arc::new(MockEmbedder::new(64));
        let store = Arc::new(MemoryStore::new(Arc::new(backend), embedder.clone()));
        let provider = Arc::new(MockProvider::new());
        let pipeline = RagPipeline::new(store.clone(), provider.clone(), "PERSONA", config);
        Fixture {
            store,
            embedder,
            provider,
            pipeline,
        }
    }

    #[tokio::test]
    async fn new_user_gets_plain_answer() {
        let f = fixture(MemoryConfig::default()).await;
        f.provider.push_response("Hello there!");
        f.provider.push_response("[]");

        let resp = f
            .pipeline
            .generate_with_context("alice", "Hi, who are you?", None)
            .await
            .unwrap();
        assert_eq!(resp.response, "Hello there!");
        assert!(resp.context_used.is_empty());
        assert!(resp.new_learnings.is_empty());

        let requests = f.provider.requests();
        assert_eq!(requests[0].system_instruction.as_deref(), Some("PERSONA"));
    }

    #[tokio::test]
    async fn memories_are_injected_and_counted() {
        let f = fixture(MemoryConfig::default()).await;
        let entry = f
            .store
            .store(
                "alice",
                NewMemory::new(MemoryCategory::Preference, "Prefers concise answers")
                    .with_importance(0.9),
            )
            .await
            .unwrap();
        f.provider.push_response("Sure, briefly: yes.");
        f.provider.push_response("[]");

        let resp = f
            .pipeline
            .generate_with_context("alice", "Prefers concise answers?", None)
            .await
            .unwrap();
        assert_eq!(resp.context_used, vec!["Prefers concise answers"]);

        let instruction = f.provider.requests()[0].system_instruction.clone().unwrap();
        assert!(instruction.contains("[preference] Prefers concise answers"));
        assert!(instruction.contains("What I know about the user:\n- Prefers concise answers"));

        let reloaded = f.store.get(&entry.id, "alice").await.unwrap();
        assert_eq!(reloaded.access_count, 1);
        assert!(reloaded.last_accessed.is_some());
    }

    #[tokio::test]
    async fn history_is_forwarded() {
        let f = fixture(MemoryConfig::default()).await;
        f.provider.push_response("ok");
        f.provider.push_response("[]");
        let history = vec![ChatTurn::user("earlier"), ChatTurn::assistant("reply")];

        f.pipeline
            .generate_with_context("alice", "and now?", Some(history))
            .await
            .unwrap();
        let request = &f.provider.requests()[0];
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].role, ChatRole::Assistant);
        assert_eq!(request.prompt, "and now?");
    }

    #[tokio::test]
    async fn learnings_are_persisted_with_metadata() {
        let f = fixture(MemoryConfig::default()).await;
        f.provider.push_response("Lyon is lovely.");
        f.provider.push_response(
            r#"[{"category": "context", "content": "Recently moved to Lyon", "importance": 0.8}]"#,
        );

        let resp = f
            .pipeline
            .generate_with_context("alice", "I just moved to Lyon", None)
            .await
            .unwrap();
        assert_eq!(resp.new_learnings.len(), 1);
        assert_eq!(resp.new_learnings[0].content, "Recently moved to Lyon");

        let stored = f.store.list_for_user("alice", None, 20).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].category, MemoryCategory::Context);
        assert_eq!(stored[0].metadata["source"], "conversation");
        assert_eq!(stored[0].metadata["auto_extracted"], true);
    }

    #[tokio::test]
    async fn duplicate_learning_is_not_stored_twice() {
        let f = fixture(MemoryConfig::default()).await;
        f.store
            .store("alice", NewMemory::new(MemoryCategory::Habit, "Runs every morning"))
            .await
            .unwrap();
        f.provider.push_response("Nice routine.");
        f.provider
            .push_response(r#"[{"category": "habit", "content": "runs every morning"}]"#);

        let resp = f
            .pipeline
            .generate_with_context("alice", "I went for my run", None)
            .await
            .unwrap();
        assert!(resp.new_learnings.is_empty());
        assert_eq!(f.store.list_for_user("alice", None, 20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn extraction_failure_is_absorbed() {
        let f = fixture(MemoryConfig::default()).await;
        f.provider.push_response("Answer");
        f.provider.push_error("extraction backend down");

        let resp = f
            .pipeline
            .generate_with_context("alice", "Tell me a joke", None)
            .await
            .unwrap();
        assert_eq!(resp.response, "Answer");
        assert!(resp.new_learnings.is_empty());
        assert!(logs_contain("learning extraction failed"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn extraction_timeout_is_absorbed() {
        let config = MemoryConfig {
            extraction_timeout_secs: 1,
            ..MemoryConfig::default()
        };
        let f = fixture(config).await;
        f.provider.push_response("Answer");
        f.provider.push_delayed(
            Duration::from_secs(10),
            r#"[{"category": "habit", "content": "Tells jokes at breakfast"}]"#,
        );

        let resp = f
            .pipeline
            .generate_with_context("alice", "Tell me a joke", None)
            .await
            .unwrap();
        assert_eq!(resp.response, "Answer");
        assert!(resp.new_learnings.is_empty());
        assert!(f.store.list_for_user("alice", None, 20).await.unwrap().is_empty());
        assert!(logs_contain("learning extraction timed out"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn slow_persistence_stops_at_the_deadline() {
        let config = MemoryConfig {
            extraction_timeout_secs: 1,
            ..MemoryConfig::default()
        };
        let f = fixture(config).await;
        f.embedder.set_delay(Duration::from_secs(2));
        f.provider.push_response("Answer");
        f.provider.push_response(
            r#"[{"category": "context", "content": "Recently moved to Lyon"}]"#,
        );

        let resp = f
            .pipeline
            .generate_with_context("alice", "I just moved to Lyon", None)
            .await
            .unwrap();
        assert_eq!(resp.response, "Answer");
        assert!(resp.new_learnings.is_empty());
        assert!(f.store.list_for_user("alice", None, 20).await.unwrap().is_empty());
        assert!(logs_contain("persisting learnings timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn generation_timeout_is_provider_unavailable() {
        let f = fixture(MemoryConfig::default()).await;
        let pipeline = RagPipeline::new(
            f.store.clone(),
            f.provider.clone(),
            "PERSONA",
            MemoryConfig::default(),
        )
        .with_generation_timeout(Duration::from_secs(5));
        f.provider.push_delayed(Duration::from_secs(60), "too late");

        let err = pipeline
            .generate_with_context("alice", "Hello there", None)
            .await
            .unwrap_err();
        match err {
            AbelError::ProviderUnavailable { message, .. } => {
                assert!(message.contains("timed out"), "got: {message}")
            }
            other => panic!("expected ProviderUnavailable, got {other:?}"),
        }
        // No extraction after a failed generation.
        assert_eq!(f.provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn extraction_can_be_disabled() {
        let config = MemoryConfig {
            extract_learnings: false,
            ..MemoryConfig::default()
        };
        let f = fixture(config).await;
        f.provider.push_response("Answer");

        f.pipeline
            .generate_with_context("alice", "Tell me a joke", None)
            .await
            .unwrap();
        assert_eq!(f.provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn disabled_memory_skips_retrieval() {
        let config = MemoryConfig {
            enabled: false,
            ..MemoryConfig::default()
        };
        let f = fixture(config).await;
        f.store
            .store("alice", NewMemory::new(MemoryCategory::Habit, "Runs every morning"))
            .await
            .unwrap();
        f.provider.push_response("Answer");

        let resp = f
            .pipeline
            .generate_with_context("alice", "Runs every morning", None)
            .await
            .unwrap();
        assert!(resp.context_used.is_empty());
        assert_eq!(f.provider.requests().len(), 1);
        assert_eq!(
            f.provider.requests()[0].system_instruction.as_deref(),
            Some("PERSONA")
        );
    }

    #[tokio::test]
    async fn generation_failure_is_provider_unavailable() {
        let f = fixture(MemoryConfig::default()).await;
        f.provider.push_error("model overloaded");
        let err = f
            .pipeline
            .generate_with_context("alice", "Hello", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AbelError::ProviderUnavailable { .. }));
        assert_eq!(f.provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_message_rejected() {
        let f = fixture(MemoryConfig::default()).await;
        let err = f
            .pipeline
            .generate_with_context("alice", "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AbelError::Validation { .. }));
        assert!(f.provider.requests().is_empty());
    }

    #[tokio::test]
    async fn learned_memory_is_searchable() {
        let f = fixture(MemoryConfig::default()).await;
        f.provider.push_response("Noted.");
        f.provider.push_response(
            r#"[{"category": "preference", "content": "Prefers window seats on flights"}]"#,
        );
        f.pipeline
            .generate_with_context("alice", "I always book a window seat", None)
            .await
            .unwrap();

        let hits = f
            .store
            .search(
                "alice",
                &SearchQuery::new("Prefers window seats on flights").with_min_similarity(0.9),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }
}
