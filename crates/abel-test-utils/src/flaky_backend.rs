// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`MemoryBackend`] wrapper with switchable failures.

use std::sync::atomic::{AtomicBool, Ordering};

use abel_core::{AbelError, AdapterType, HealthStatus, PluginAdapter};
use abel_memory::{MemoryBackend, MemoryCategory, MemoryEntry, SearchResult, SqliteBackend};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Delegates to a [`SqliteBackend`] unless a failure switch is on.
///
/// `fail_reads` breaks `similar` and `list` (retrieval); `fail_access`
/// breaks `increment_access` (bookkeeping).
pub struct FlakyBackend {
    inner: SqliteBackend,
    fail_reads: AtomicBool,
    fail_access: AtomicBool,
}

fn injected(operation: &str) -> AbelError {
    AbelError::Storage {
        source: format!("injected {operation} failure").into(),
    }
}

impl FlakyBackend {
    pub fn new(inner: SqliteBackend) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_access: AtomicBool::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_access(&self, fail: bool) {
        self.fail_access.store(fail, Ordering::SeqCst);
    }

    fn reads_broken(&self) -> bool {
        self.fail_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for FlakyBackend {
    fn name(&self) -> &str {
        "flaky-memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, AbelError> {
        if self.reads_broken() {
            return Ok(HealthStatus::Degraded("reads failing".into()));
        }
        self.inner.health_check().await
    }

    async fn shutdown(&self) -> Result<(), AbelError> {
        self.inner.shutdown().await
    }
}

#[async_trait]
impl MemoryBackend for FlakyBackend {
    async fn insert(&self, entry: &MemoryEntry) -> Result<(), AbelError> {
        self.inner.insert(entry).await
    }

    async fn get(&self, id: &str, user_id: &str) -> Result<Option<MemoryEntry>, AbelError> {
        self.inner.get(id, user_id).await
    }

    async fn list(
        &self,
        user_id: &str,
        category: Option<MemoryCategory>,
        limit: Option<usize>,
    ) -> Result<Vec<MemoryEntry>, AbelError> {
        if self.reads_broken() {
            return Err(injected("list"));
        }
        self.inner.list(user_id, category, limit).await
    }

    async fn update_importance(
        &self,
        id: &str,
        user_id: Option<&str>,
        importance: f64,
        at: DateTime<Utc>,
    ) -> Result<bool, AbelError> {
        self.inner.update_importance(id, user_id, importance, at).await
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
        self.inner
            .update_content(id, user_id, content, embedding, importance, at)
            .await
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, AbelError> {
        self.inner.delete(id, user_id).await
    }

    async fn clear(&self, user_id: &str) -> Result<usize, AbelError> {
        self.inner.clear(user_id).await
    }

    async fn increment_access(&self, id: &str, at: DateTime<Utc>) -> Result<bool, AbelError> {
        if self.fail_access.load(Ordering::SeqCst) {
            return Err(injected("increment_access"));
        }
        self.inner.increment_access(id, at).await
    }

    async fn similar(
        &self,
        user_id: &str,
        embedding: &[f32],
        category: Option<MemoryCategory>,
        min_similarity: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>, AbelError> {
        if self.reads_broken() {
            return Err(injected("similar"));
        }
        self.inner
            .similar(user_id, embedding, category, min_similarity, limit)
            .await
    }
}
