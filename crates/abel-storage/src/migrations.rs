// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied on
//! every [`Database`](crate::Database) open.

use abel_core::AbelError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies pending migrations. Refinery records applied versions in
/// `refinery_schema_history`, so repeated runs are no-ops.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), AbelError> {
    embedded::migrations::runner()
        .run(conn)
        .map_err(|e| AbelError::Storage {
            source: Box::new(e),
        })?;
    Ok(())
}
