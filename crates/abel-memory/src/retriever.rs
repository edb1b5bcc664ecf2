// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the personal context for one generation.
//!
//! Three parts, each possibly empty: memories semantically close to the
//! message, a profile of the user's most important memories, and topic
//! tags carried by the retrieved memories.

use std::sync::Arc;

use abel_config::model::MemoryConfig;
use abel_core::AbelError;
use serde_json::Value;
use tracing::debug;

use crate::store::MemoryStore;
use crate::types::{RagContext, SearchQuery, SearchResult, MAX_QUERY_CHARS, MIN_QUERY_CHARS};

/// Builds a [`RagContext`] from a user's memories.
pub struct ContextRetriever {
    store: Arc<MemoryStore>,
    config: MemoryConfig,
}

impl ContextRetriever {
    pub fn new(store: Arc<MemoryStore>, config: MemoryConfig) -> Self {
        Self { store, config }
    }

    /// Retrieves up to `max_memories` relevant memories plus profile and topics.
    ///
    /// A user with no memories gets an empty context. Store errors propagate.
    pub async fn retrieve_context(
        &self,
        user_id: &str,
        query: &str,
        max_memories: usize,
    ) -> Result<RagContext, AbelError> {
        let memories = self.relevant_memories(user_id, query, max_memories).await?;
        let profile_summary = self.profile_summary(user_id).await?;
        let recent_topics = collect_topics(&memories, self.config.max_recent_topics);

        debug!(
            user_id,
            memories = memories.len(),
            topics = recent_topics.len(),
            has_profile = !profile_summary.is_empty(),
            "context retrieved"
        );
        Ok(RagContext {
            memories,
            profile_summary,
            recent_topics,
        })
    }

    async fn relevant_memories(
        &self,
        user_id: &str,
        query: &str,
        max_memories: usize,
    ) -> Result<Vec<SearchResult>, AbelError> {
        // Messages may exceed the search bounds; only the head is embedded.
        let query: String = query.trim().chars().take(MAX_QUERY_CHARS).collect();
        if query.chars().count() < MIN_QUERY_CHARS || max_memories == 0 {
            return Ok(Vec::new());
        }
        let search = SearchQuery::new(query)
            .with_limit(max_memories.min(crate::types::MAX_SEARCH_LIMIT))
            .with_min_similarity(self.config.retrieval_min_similarity);
        self.store.search(user_id, &search).await
    }

    async fn profile_summary(&self, user_id: &str) -> Result<String, AbelError> {
        if self.config.profile_candidates == 0 {
            return Ok(String::new());
        }
        let candidates = self
            .store
            .list_for_user(user_id, None, self.config.profile_candidates)
            .await?;
        let lines: Vec<String> = candidates
            .iter()
            .filter(|e| e.importance >= self.config.profile_min_importance)
            .take(self.config.profile_max_entries)
            .map(|e| format!("- {}", e.content))
            .collect();
        Ok(lines.join("\n"))
    }
}

/// Distinct `topics` tags across `memories`, first occurrence wins.
fn collect_topics(memories: &[SearchResult], max: usize) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for result in memories {
        let tags: Vec<&str> = match result.entry.metadata.get("topics") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(s)) => vec![s.as_str()],
            _ => continue,
        };
        for tag in tags {
            if topics.len() >= max {
                return topics;
            }
            let tag = tag.trim();
            if !tag.is_empty() && !topics.iter().any(|t| t == tag) {
                topics.push(tag.to_string());
            }
        }
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqliteBackend;
    use crate::types::{MemoryCategory, Metadata, NewMemory};
    use abel_storage::Database;
    use abel_test_utils::MockEmbedder;
    use serde_json::json;

    async fn setup() -> (Arc<MemoryStore>, ContextRetriever) {
        let backend = SqliteBackend::new(Database::open_in_memory().await.unwrap());
        let store = Arc::new(MemoryStore::new(
            Arc::new(backend),
            Arc::new(MockEmbedder::new(64)),
        ));
        let retriever = ContextRetriever::new(store.clone(), MemoryConfig::default());
        (store, retriever)
    }

    fn topics(value: serde_json::Value) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("topics".into(), value);
        metadata
    }

    #[tokio::test]
    async fn brand_new_user_gets_empty_context() {
        let (_, retriever) = setup().await;
        let context = retriever
            .retrieve_context("nobody", "What should I cook tonight?", 5)
            .await
            .unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn profile_keeps_only_important_memories() {
        let (store, retriever) = setup().await;
        for (content, importance) in [
            ("Works as a nurse", 0.9),
            ("Has two cats", 0.7),
            ("Watched a movie yesterday", 0.3),
        ] {
            store
                .store(
                    "alice",
                    NewMemory::new(MemoryCategory::Knowledge, content).with_importance(importance),
                )
                .await
                .unwrap();
        }
        let context = retriever.retrieve_context("alice", "hi", 5).await.unwrap();
        assert_eq!(context.profile_summary, "- Works as a nurse\n- Has two cats");
    }

    #[tokio::test]
    async fn relevant_memories_and_topics() {
        let (store, retriever) = setup().await;
        store
            .store(
                "alice",
                NewMemory::new(MemoryCategory::Preference, "Loves spicy thai food")
                    .with_metadata(topics(json!(["food", "travel"]))),
            )
            .await
            .unwrap();
        store
            .store(
                "alice",
                NewMemory::new(MemoryCategory::Habit, "Loves spicy thai food at lunch")
                    .with_metadata(topics(json!("food"))),
            )
            .await
            .unwrap();

        let context = retriever
            .retrieve_context("alice", "Loves spicy thai food", 5)
            .await
            .unwrap();
        assert_eq!(context.memories.len(), 2);
        assert!(context
            .memories
            .iter()
            .all(|m| m.similarity >= MemoryConfig::default().retrieval_min_similarity));
        assert_eq!(context.recent_topics, vec!["food", "travel"]);
    }

    #[tokio::test]
    async fn tiny_query_skips_search() {
        let (store, retriever) = setup().await;
        store
            .store("alice", NewMemory::new(MemoryCategory::Habit, "a b"))
            .await
            .unwrap();
        let context = retriever.retrieve_context("alice", " ? ", 5).await.unwrap();
        assert!(context.memories.is_empty());
    }

    #[test]
    fn topics_are_capped_and_deduplicated() {
        let now = chrono::Utc::now();
        let make = |meta: Metadata| SearchResult {
            entry: crate::types::MemoryEntry {
                id: "x".into(),
                user_id: "u".into(),
                category: MemoryCategory::Context,
                content: "something".into(),
                embedding: vec![],
                importance: 0.5,
                access_count: 0,
                created_at: now,
                updated_at: now,
                last_accessed: None,
                metadata: meta,
            },
            similarity: 0.9,
        };
        let memories = vec![
            make(topics(json!(["a", "b", "a"]))),
            make(Metadata::new()),
            make(topics(json!(["c", "d", "e"]))),
        ];
        assert_eq!(collect_topics(&memories, 3), vec!["a", "b", "c"]);
        assert_eq!(collect_topics(&memories, 10), vec!["a", "b", "c", "d", "e"]);
    }
}
