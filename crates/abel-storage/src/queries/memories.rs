// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row operations on `user_memories`.
//!
//! Every read and every ownership-sensitive write filters on `user_id`.

use abel_core::AbelError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::{map_tr_err, Database};
use crate::models::MemoryRow;

const COLUMNS: &str = "id, user_id, category, content, embedding, importance, access_count, \
                       created_at, updated_at, last_accessed, metadata";

fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<MemoryRow> {
    Ok(MemoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        content: row.get(3)?,
        embedding: row.get(4)?,
        importance: row.get(5)?,
        access_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        last_accessed: row.get(9)?,
        metadata: row.get(10)?,
    })
}

/// Insert a new memory row.
pub async fn insert_memory(db: &Database, memory: &MemoryRow) -> Result<(), AbelError> {
    let m = memory.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO user_memories (id, user_id, category, content, embedding, importance,
                     access_count, created_at, updated_at, last_accessed, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    m.id,
                    m.user_id,
                    m.category,
                    m.content,
                    m.embedding,
                    m.importance,
                    m.access_count,
                    m.created_at,
                    m.updated_at,
                    m.last_accessed,
                    m.metadata,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a memory by ID, only if it belongs to `user_id`.
pub async fn get_memory(
    db: &Database,
    id: &str,
    user_id: &str,
) -> Result<Option<MemoryRow>, AbelError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MemoryRow>, rusqlite::Error> {
            let sql = format!("SELECT {COLUMNS} FROM user_memories WHERE id = ?1 AND user_id = ?2");
            conn.query_row(&sql, params![id, user_id], row_to_memory)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List a user's memories, optionally filtered by category.
///
/// Ordered by importance desc, then newest first, then id for a stable order.
/// `limit = None` returns every row.
pub async fn list_memories(
    db: &Database,
    user_id: &str,
    category: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<MemoryRow>, AbelError> {
    let user_id = user_id.to_string();
    let category = category.map(str::to_string);
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRow>, rusqlite::Error> {
            let sql = format!(
                "SELECT {COLUMNS} FROM user_memories
                 WHERE user_id = ?1 AND (?2 IS NULL OR category = ?2)
                 ORDER BY importance DESC, created_at DESC, id ASC
                 LIMIT ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![user_id, category, limit], row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Set the importance of a memory. Returns whether a row was changed.
pub async fn update_importance(
    db: &Database,
    id: &str,
    importance: f64,
    updated_at: &str,
) -> Result<bool, AbelError> {
    let id = id.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE user_memories SET importance = ?1, updated_at = ?2 WHERE id = ?3",
                params![importance, updated_at, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace content (with its new embedding) and optionally importance of an
/// owned memory. Returns whether a row was changed.
pub async fn update_content(
    db: &Database,
    id: &str,
    user_id: &str,
    content: &str,
    embedding: Vec<u8>,
    importance: Option<f64>,
    updated_at: &str,
) -> Result<bool, AbelError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    let content = content.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE user_memories
                 SET content = ?1, embedding = ?2, importance = COALESCE(?3, importance), updated_at = ?4
                 WHERE id = ?5 AND user_id = ?6",
                params![content, embedding, importance, updated_at, id, user_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Set the importance of an owned memory. Returns whether a row was changed.
pub async fn update_owned_importance(
    db: &Database,
    id: &str,
    user_id: &str,
    importance: f64,
    updated_at: &str,
) -> Result<bool, AbelError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    let updated_at = updated_at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE user_memories SET importance = ?1, updated_at = ?2
                 WHERE id = ?3 AND user_id = ?4",
                params![importance, updated_at, id, user_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Hard-delete an owned memory. Returns whether a row was removed.
pub async fn delete_memory(db: &Database, id: &str, user_id: &str) -> Result<bool, AbelError> {
    let id = id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM user_memories WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Hard-delete every memory of a user. Returns the number removed.
pub async fn clear_memories(db: &Database, user_id: &str) -> Result<usize, AbelError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM user_memories WHERE user_id = ?1",
                params![user_id],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically bump `access_count` and stamp `last_accessed`.
/// Returns whether a row was changed.
pub async fn increment_access(
    db: &Database,
    id: &str,
    accessed_at: &str,
) -> Result<bool, AbelError> {
    let id = id.to_string();
    let accessed_at = accessed_at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE user_memories
                 SET access_count = access_count + 1, last_accessed = ?1
                 WHERE id = ?2",
                params![accessed_at, id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
