// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term personal memory and retrieval-augmented generation.
//!
//! ## Architecture
//!
//! - **MemoryBackend** / **SqliteBackend**: persistence seam with client-side cosine scoring
//! - **MemoryStore**: validation, embedding and per-user CRUD plus semantic search
//! - **ContextRetriever**: relevant memories, profile summary and topics for one message
//! - **LearningExtractor**: LLM-based extraction of new facts from an exchange
//! - **RagPipeline**: retrieval, generation, access bookkeeping and learning in one call
//! - **Types**: MemoryEntry, MemoryCategory, SearchQuery, RagContext, RagResponse

pub mod backend;
pub mod extractor;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod store;
pub mod types;

pub use backend::{MemoryBackend, SqliteBackend};
pub use extractor::{ExtractionParseError, LearningExtractor};
pub use pipeline::RagPipeline;
pub use retriever::ContextRetriever;
pub use store::MemoryStore;
pub use types::*;
