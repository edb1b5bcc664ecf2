// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence seam for memories.
//!
//! [`MemoryBackend`] is what [`MemoryStore`](crate::MemoryStore) writes
//! through. [`SqliteBackend`] stores rows in `user_memories` with the
//! embedding as a BLOB and scores similarity client-side.

use std::cmp::Ordering;
use std::str::FromStr;

use abel_core::{AbelError, AdapterType, HealthStatus, PluginAdapter};
use abel_storage::queries::memories;
use abel_storage::{Database, MemoryRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{
    blob_to_vec, cosine_similarity, format_timestamp, parse_timestamp, vec_to_blob,
    MemoryCategory, MemoryEntry, Metadata, SearchResult,
};

/// Storage operations the memory store depends on.
///
/// Every method that takes a `user_id` must never read or modify another
/// user's rows.
#[async_trait]
pub trait MemoryBackend: PluginAdapter {
    async fn insert(&self, entry: &MemoryEntry) -> Result<(), AbelError>;

    async fn get(&self, id: &str, user_id: &str) -> Result<Option<MemoryEntry>, AbelError>;

    /// Entries ordered by importance desc, then `created_at` desc.
    /// `limit = None` returns all of them.
    async fn list(
        &self,
        user_id: &str,
        category: Option<MemoryCategory>,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryEntry>, AbelError>;

    /// Returns `false` when no row matched. `user_id = None` skips the
    /// ownership filter.
    async fn update_importance(
        &self,
        id: &str,
        user_id: Option<&str>,
        importance: f64,
        at: DateTime<Utc>,
    ) -> Result<bool, AbelError>;

    /// Replaces content and embedding (and importance when given).
    /// Returns `false` when no owned row matched.
    async fn update_content(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
        embedding: &[f32],
        importance: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<bool, AbelError>;

    /// Returns `false` when no owned row matched.
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, AbelError>;

    /// Returns the number of rows removed.
    async fn clear(&self, user_id: &str) -> Result<usize, AbelError>;

    /// Atomically adds one to `access_count` and sets `last_accessed`.
    async fn increment_access(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AbelError>;

    /// Entries with similarity to `embedding` of at least `min_similarity`,
    /// best first, at most `limit`.
    ///
    /// The provided implementation scores every candidate in process.
    /// Entries whose embedding is empty or of another dimension are skipped.
    async fn similar(
        &self,
        user_id: &str,
        embedding: &[f32],
        category: Option<MemoryCategory>,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>, AbelError> {
        let candidates = self.list(user_id, category, None).await?;
        let scanned = candidates.len();
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|entry| entry.embedding.len() == embedding.len() && !entry.embedding.is_empty())
            .map(|entry| {
                let similarity = cosine_similarity(&entry.embedding, embedding);
                SearchResult { entry, similarity }
            })
            .filter(|r| r.similarity >= min_similarity)
            .collect();
        rank_results(&mut results);
        results.truncate(limit);
        debug!(scanned, matched = results.len(), "similarity scan complete");
        Ok(results)
    }
}

/// Orders by similarity desc, then newest first, then id asc.
pub fn rank_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
}

/// SQLite-backed [`MemoryBackend`].
#[derive(Clone)]
pub struct SqliteBackend {
    db: Database,
}

impl SqliteBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn entry_to_row(entry: &MemoryEntry) -> Result<MemoryRow, AbelError> {
    let metadata = serde_json::to_string(&entry.metadata).map_err(|e| AbelError::Storage {
        source: Box::new(e),
    })?;
    Ok(MemoryRow {
        id: entry.id.clone(),
        user_id: entry.user_id.clone(),
        category: entry.category.to_string(),
        content: entry.content.clone(),
        embedding: vec_to_blob(&entry.embedding),
        importance: entry.importance,
        access_count: i64::try_from(entry.access_count).unwrap_or(i64::MAX),
        created_at: format_timestamp(&entry.created_at),
        updated_at: format_timestamp(&entry.updated_at),
        last_accessed: entry.last_accessed.as_ref().map(format_timestamp),
        metadata,
    })
}

fn row_to_entry(row: MemoryRow) -> Result<MemoryEntry, AbelError> {
    let category = MemoryCategory::from_str(&row.category).map_err(|_| AbelError::Storage {
        source: format!("memory {} has unknown category `{}`", row.id, row.category).into(),
    })?;
    // Rows written by other tools may carry non-object metadata; treat it as empty.
    let metadata = serde_json::from_str::<Metadata>(&row.metadata).unwrap_or_default();
    Ok(MemoryEntry {
        category,
        content: row.content,
        embedding: blob_to_vec(&row.embedding),
        importance: row.importance,
        access_count: u64::try_from(row.access_count).unwrap_or(0),
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        last_accessed: row.last_accessed.as_deref().map(parse_timestamp).transpose()?,
        metadata,
        id: row.id,
        user_id: row.user_id,
    })
}

#[async_trait]
impl PluginAdapter for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite-memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AbelError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), AbelError> {
        self.db.close().await
    }
}

#[async_trait]
impl MemoryBackend for SqliteBackend {
    async fn insert(&self, entry: &MemoryEntry) -> Result<(), AbelError> {
        memories::insert_memory(&self.db, &entry_to_row(entry)?).await
    }

    async fn get(&self, id: &str, user_id: &str) -> Result<Option<MemoryEntry>, AbelError> {
        memories::get_memory(&self.db, id, user_id)
            .await?
            .map(row_to_entry)
            .transpose()
    }

    async fn list(
        &self,
        user_id: &str,
        category: Option<MemoryCategory>,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryEntry>, AbelError> {
        let category = category.map(|c| c.to_string());
        memories::list_memories(&self.db, user_id, category.as_deref(), limit)
            .await?
            .into_iter()
            .map(row_to_entry)
            .collect()
    }

    async fn update_importance(
        &self,
        id: &str,
        user_id: Option<&str>,
        importance: f64,
        at: DateTime<Utc>,
    ) -> Result<bool, AbelError> {
        let at = format_timestamp(&at);
        match user_id {
            Some(user_id) => {
                memories::update_owned_importance(&self.db, id, user_id, importance, &at).await
            }
            None => memories::update_importance(&self.db, id, importance, &at).await,
        }
    }

    async fn update_content(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
        embedding: &[f32],
        importance: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<bool, AbelError> {
        memories::update_content(
            &self.db,
            id,
            user_id,
            content,
            vec_to_blob(embedding),
            importance,
            &format_timestamp(&at),
        )
        .await
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, AbelError> {
        memories::delete_memory(&self.db, id, user_id).await
    }

    async fn clear(&self, user_id: &str) -> Result<usize, AbelError> {
        memories::clear_memories(&self.db, user_id).await
    }

    async fn increment_access(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AbelError> {
        memories::increment_access(&self.db, id, &format_timestamp(&at)).await
    }
}
