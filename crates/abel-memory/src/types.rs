// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types, input bounds, and vector helpers.

use std::collections::BTreeMap;

use abel_core::AbelError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Free-form JSON attributes attached to a memory.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_IMPORTANCE: f64 = 0.5;
pub const MIN_CONTENT_CHARS: usize = 3;
pub const MAX_CONTENT_CHARS: usize = 2000;
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_QUERY_CHARS: usize = 500;
pub const MAX_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.6;
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// What kind of fact a memory records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    /// Likes, dislikes, preferred styles ("prefers concise answers").
    Preference,
    /// Recurring behavior ("works late on Fridays").
    Habit,
    /// What the user knows or does ("is a Python developer").
    Knowledge,
    /// Ongoing situation ("is planning a trip to Lisbon").
    Context,
    /// Character traits ("is easily bored by small talk").
    Personality,
}

impl MemoryCategory {
    pub const ALL: [MemoryCategory; 5] = [
        MemoryCategory::Preference,
        MemoryCategory::Habit,
        MemoryCategory::Knowledge,
        MemoryCategory::Context,
        MemoryCategory::Personality,
    ];
}

/// A single long-term memory owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub user_id: String,
    pub category: MemoryCategory,
    pub content: String,
    /// Document embedding of `content`. Not part of the serialized view.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// 0.0-1.0; how defining this fact is for the user.
    pub importance: f64,
    pub access_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Input for [`MemoryStore::store`](crate::MemoryStore::store).
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    pub category: MemoryCategory,
    pub content: String,
    pub importance: f64,
    pub metadata: Metadata,
}

impl NewMemory {
    pub fn new(category: MemoryCategory, content: impl Into<String>) -> Self {
        Self {
            category,
            content: content.into(),
            importance: DEFAULT_IMPORTANCE,
            metadata: Metadata::new(),
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Partial update of an existing memory. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryUpdate {
    pub importance: Option<f64>,
    /// New content; the embedding is recomputed.
    pub content: Option<String>,
}

/// Parameters of a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub category: Option<MemoryCategory>,
    pub limit: usize,
    pub min_similarity: f64,
}

impl SearchQuery {
    /// A query with the default limit (5) and threshold (0.6).
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
            limit: DEFAULT_SEARCH_LIMIT,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }

    pub fn with_category(mut self, category: MemoryCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// A memory with its cosine similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub entry: MemoryEntry,
    pub similarity: f64,
}

/// Aggregate view over all of a user's memories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total: usize,
    pub by_category: BTreeMap<MemoryCategory, usize>,
    pub avg_importance: f64,
    pub most_accessed: Option<MemoryEntry>,
    pub latest: Option<MemoryEntry>,
}

/// Personal context retrieved for one generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RagContext {
    pub memories: Vec<SearchResult>,
    /// `- content` lines of high-importance memories, newline-joined.
    pub profile_summary: String,
    pub recent_topics: Vec<String>,
}

impl RagContext {
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty() && self.profile_summary.is_empty() && self.recent_topics.is_empty()
    }
}

/// Result of [`RagPipeline::generate_with_context`](crate::RagPipeline::generate_with_context).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub response: String,
    /// Contents of the memories injected into the prompt.
    pub context_used: Vec<String>,
    /// Learnings that were persisted as new memories.
    pub new_learnings: Vec<LearningCandidate>,
}

/// A fact proposed by the learning extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCandidate {
    pub category: MemoryCategory,
    pub content: String,
    pub importance: f64,
}

// --- Validation ---

/// Trims and bounds-checks memory content.
pub fn validate_content(content: &str) -> Result<String, AbelError> {
    let trimmed = content.trim();
    let chars = trimmed.chars().count();
    if !(MIN_CONTENT_CHARS..=MAX_CONTENT_CHARS).contains(&chars) {
        return Err(AbelError::validation(
            "content",
            format!(
                "must be between {MIN_CONTENT_CHARS} and {MAX_CONTENT_CHARS} characters, got {chars}"
            ),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trims and bounds-checks a search query.
pub fn validate_query(query: &str) -> Result<String, AbelError> {
    let trimmed = query.trim();
    let chars = trimmed.chars().count();
    if !(MIN_QUERY_CHARS..=MAX_QUERY_CHARS).contains(&chars) {
        return Err(AbelError::validation(
            "query",
            format!("must be between {MIN_QUERY_CHARS} and {MAX_QUERY_CHARS} characters, got {chars}"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn validate_importance(importance: f64) -> Result<(), AbelError> {
    check_unit_interval("importance", importance)
}

pub fn validate_min_similarity(min_similarity: f64) -> Result<(), AbelError> {
    check_unit_interval("min_similarity", min_similarity)
}

pub fn validate_search_limit(limit: usize) -> Result<(), AbelError> {
    if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
        return Err(AbelError::validation(
            "limit",
            format!("must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"),
        ));
    }
    Ok(())
}

pub fn validate_user_id(user_id: &str) -> Result<(), AbelError> {
    if user_id.trim().is_empty() {
        return Err(AbelError::validation("user_id", "must not be empty"));
    }
    Ok(())
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), AbelError> {
    // NaN fails `contains`.
    if !(0.0..=1.0).contains(&value) {
        return Err(AbelError::validation(
            field,
            format!("must be between 0 and 1, got {value}"),
        ));
    }
    Ok(())
}

// --- Vectors ---

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 when the vectors differ in length, are empty, or either has
/// zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Convert f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert SQLite BLOB back to f32 vector. Trailing partial chunks are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

// --- Timestamps ---

/// Millisecond-precision RFC 3339 in UTC, e.g. `2026-03-01T12:00:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AbelError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AbelError::Storage {
            source: format!("invalid timestamp `{raw}`: {e}").into(),
        })
}
