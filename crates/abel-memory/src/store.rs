// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory store: validation, embedding, and per-user persistence.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use abel_core::{AbelError, EmbeddingAdapter, EmbeddingMode};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::MemoryBackend;
use crate::types::{
    validate_content, validate_importance, validate_min_similarity, validate_query,
    validate_search_limit, validate_user_id, MemoryCategory, MemoryEntry, MemoryStats,
    MemoryUpdate, NewMemory, SearchQuery, SearchResult,
};

/// Current time at the precision timestamps are persisted with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Default bound on a single embedding call.
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-user memory persistence with semantic search.
///
/// All inputs are validated before any embedding or storage call.
pub struct MemoryStore {
    backend: Arc<dyn MemoryBackend>,
    embedder: Arc<dyn EmbeddingAdapter>,
    embed_timeout: Duration,
}

impl MemoryStore {
    pub fn new(backend: Arc<dyn MemoryBackend>, embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        Self {
            backend,
            embedder,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, AbelError> {
        let vector = tokio::time::timeout(self.embed_timeout, self.embedder.embed(text, mode))
            .await
            .map_err(|_| AbelError::Timeout {
                duration: self.embed_timeout,
            })??;
        if vector.is_empty() {
            return Err(AbelError::provider("embedding provider returned an empty vector"));
        }
        Ok(vector)
    }

    /// Validates, embeds and persists a new memory.
    pub async fn store(&self, user_id: &str, memory: NewMemory) -> Result<MemoryEntry, AbelError> {
        validate_user_id(user_id)?;
        let content = validate_content(&memory.content)?;
        validate_importance(memory.importance)?;

        let embedding = self.embed(&content, EmbeddingMode::Document).await?;
        self.insert(user_id, memory, content, embedding).await
    }

    /// Like [`store`](Self::store), but returns `Ok(None)` without writing
    /// when an existing memory of the user is at least `threshold` similar.
    pub async fn store_unless_duplicate(
        &self,
        user_id: &str,
        memory: NewMemory,
        threshold: f64,
    ) -> Result<Option<MemoryEntry>, AbelError> {
        validate_user_id(user_id)?;
        let content = validate_content(&memory.content)?;
        validate_importance(memory.importance)?;
        validate_min_similarity(threshold)?;

        let embedding = self.embed(&content, EmbeddingMode::Document).await?;
        let nearest = self
            .backend
            .similar(user_id, &embedding, None, threshold, 1)
            .await?;
        if let Some(existing) = nearest.first() {
            debug!(
                existing_id = %existing.entry.id,
                similarity = existing.similarity,
                "skipping near-duplicate memory"
            );
            return Ok(None);
        }
        self.insert(user_id, memory, content, embedding).await.map(Some)
    }

    async fn insert(
        &self,
        user_id: &str,
        memory: NewMemory,
        content: String,
        embedding: Vec<f32>,
    ) -> Result<MemoryEntry, AbelError> {
        let now = now();
        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category: memory.category,
            content,
            embedding,
            importance: memory.importance,
            access_count: 0,
            created_at: now,
            updated_at: now,
            last_accessed: None,
            metadata: memory.metadata,
        };
        self.backend.insert(&entry).await?;
        info!(
            memory_id = %entry.id,
            user_id,
            category = %entry.category,
            "memory stored"
        );
        Ok(entry)
    }

    /// Semantic search over one user's memories.
    ///
    /// Results have similarity `>= query.min_similarity`, are ordered best
    /// first, and number at most `query.limit`.
    pub async fn search(
        &self,
        user_id: &str,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>, AbelError> {
        validate_user_id(user_id)?;
        let text = validate_query(&query.query)?;
        validate_search_limit(query.limit)?;
        validate_min_similarity(query.min_similarity)?;

        let embedding = self.embed(&text, EmbeddingMode::Query).await?;
        let results = self
            .backend
            .similar(
                user_id,
                &embedding,
                query.category,
                query.min_similarity,
                query.limit,
            )
            .await?;
        debug!(user_id, results = results.len(), "memory search complete");
        Ok(results)
    }

    /// A user's memories by importance (desc), newest first among equals.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        category: Option<MemoryCategory>,
        limit: usize,
    ) -> Result<Vec<MemoryEntry>, AbelError> {
        validate_user_id(user_id)?;
        if limit == 0 {
            return Err(AbelError::validation("limit", "must be at least 1"));
        }
        self.backend.list(user_id, category, Some(limit)).await
    }

    /// One memory, only if owned by `user_id`.
    pub async fn get(&self, id: &str, user_id: &str) -> Result<MemoryEntry, AbelError> {
        validate_user_id(user_id)?;
        self.backend
            .get(id, user_id)
            .await?
            .ok_or_else(|| AbelError::not_found(id))
    }

    /// Sets the importance of a memory by id.
    pub async fn update_importance(&self, id: &str, importance: f64) -> Result<(), AbelError> {
        validate_importance(importance)?;
        if !self
            .backend
            .update_importance(id, None, importance, now())
            .await?
        {
            return Err(AbelError::not_found(id));
        }
        debug!(memory_id = id, importance, "importance updated");
        Ok(())
    }

    /// Applies an ownership-checked partial update and returns the new state.
    ///
    /// A content change re-embeds the memory so search reflects the new text.
    pub async fn update_memory(
        &self,
        id: &str,
        user_id: &str,
        update: MemoryUpdate,
    ) -> Result<MemoryEntry, AbelError> {
        validate_user_id(user_id)?;
        if update.importance.is_none() && update.content.is_none() {
            return Err(AbelError::validation(
                "update",
                "at least one of importance or content is required",
            ));
        }
        if let Some(importance) = update.importance {
            validate_importance(importance)?;
        }
        let content = update.content.as_deref().map(validate_content).transpose()?;

        let changed = match content {
            Some(content) => {
                let embedding = self.embed(&content, EmbeddingMode::Document).await?;
                self.backend
                    .update_content(
                        id,
                        user_id,
                        &content,
                        &embedding,
                        update.importance,
                        now(),
                    )
                    .await?
            }
            None => {
                // Checked above: importance is set when content is not.
                let importance = update.importance.unwrap_or_default();
                self.backend
                    .update_importance(id, Some(user_id), importance, now())
                    .await?
            }
        };
        if !changed {
            return Err(AbelError::not_found(id));
        }
        info!(memory_id = id, user_id, "memory updated");
        self.get(id, user_id).await
    }

    /// Hard-deletes one owned memory.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<(), AbelError> {
        validate_user_id(user_id)?;
        if !self.backend.delete(id, user_id).await? {
            return Err(AbelError::not_found(id));
        }
        info!(memory_id = id, user_id, "memory deleted");
        Ok(())
    }

    /// Hard-deletes all of a user's memories and returns how many there were.
    pub async fn clear_all(&self, user_id: &str) -> Result<usize, AbelError> {
        validate_user_id(user_id)?;
        let removed = self.backend.clear(user_id).await?;
        info!(user_id, removed, "memories cleared");
        Ok(removed)
    }

    /// Records that a memory was used in a generation.
    pub async fn increment_access(&self, id: &str) -> Result<(), AbelError> {
        if !self.backend.increment_access(id, now()).await? {
            return Err(AbelError::not_found(id));
        }
        Ok(())
    }

    /// Totals, category breakdown and notable entries over all of a user's memories.
    pub async fn get_stats(&self, user_id: &str) -> Result<MemoryStats, AbelError> {
        validate_user_id(user_id)?;
        let entries = self.backend.list(user_id, None, None).await?;

        let mut by_category = BTreeMap::new();
        for entry in &entries {
            *by_category.entry(entry.category).or_insert(0) += 1;
        }
        let avg_importance = if entries.is_empty() {
            0.0
        } else {
            entries.iter().map(|e| e.importance).sum::<f64>() / entries.len() as f64
        };
        // Entries arrive importance-ordered; the first one wins ties.
        let most_accessed = entries
            .iter()
            .fold(None::<&MemoryEntry>, |best, e| match best {
                Some(b) if b.access_count >= e.access_count => Some(b),
                _ => Some(e),
            })
            .cloned();
        let latest = entries
            .iter()
            .fold(None::<&MemoryEntry>, |best, e| match best {
                Some(b) if b.created_at >= e.created_at => Some(b),
                _ => Some(e),
            })
            .cloned();

        Ok(MemoryStats {
            total: entries.len(),
            by_category,
            avg_importance,
            most_accessed,
            latest,
        })
    }
}
