// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Rows carry the column values as stored: categories and timestamps as
//! text, the embedding as a little-endian `f32` BLOB, metadata as JSON text.
//! Typed domain conversion happens in `abel-memory`.

/// One row of the `user_memories` table.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub content: String,
    pub embedding: Vec<u8>,
    pub importance: f64,
    pub access_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub last_accessed: Option<String>,
    pub metadata: String,
}

