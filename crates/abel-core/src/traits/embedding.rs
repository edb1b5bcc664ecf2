// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::AbelError;
use crate::traits::adapter::PluginAdapter;
use crate::types::EmbeddingMode;

/// Adapter for generating fixed-dimension vector embeddings from text.
///
/// Implementations must return exactly [`EmbeddingAdapter::dimensions`]
/// floats for every call and must surface failures as errors. A zero vector
/// is never an acceptable stand-in for a failed call.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Number of dimensions of every vector this adapter produces.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for `text` in the given mode.
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, AbelError>;

    /// Embeds text that will be stored and searched against.
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, AbelError> {
        self.embed(text, EmbeddingMode::Document).await
    }

    /// Embeds text used to search stored documents.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AbelError> {
        self.embed(text, EmbeddingMode::Query).await
    }
}
