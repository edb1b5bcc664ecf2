// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Abel assistant core.

use thiserror::Error;

/// The primary error type used across all Abel adapter traits and core operations.
#[derive(Debug, Error)]
pub enum AbelError {
    /// Malformed input rejected before any I/O (bad category, content length,
    /// importance out of range, ...).
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// The memory does not exist or is owned by a different user.
    #[error("memory not found: {id}")]
    NotFound { id: String },

    /// Embeddings or language-model provider unreachable or erroring.
    #[error("provider unavailable: {message}")]
    ProviderUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (missing API key, invalid header value, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AbelError {
    /// Shorthand for a [`AbelError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AbelError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`AbelError::ProviderUnavailable`] error without a source.
    pub fn provider(message: impl Into<String>) -> Self {
        AbelError::ProviderUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`AbelError::NotFound`] error.
    pub fn not_found(id: impl Into<String>) -> Self {
        AbelError::NotFound { id: id.into() }
    }

    /// Stable message that is safe to show to an end user.
    ///
    /// Validation messages are passed through; everything originating from a
    /// provider or the database collapses to a generic text so raw upstream
    /// errors never leak.
    pub fn user_message(&self) -> String {
        match self {
            AbelError::Validation { field, message } => format!("invalid {field}: {message}"),
            AbelError::NotFound { .. } => "memory not found".to_string(),
            AbelError::ProviderUnavailable { .. } | AbelError::Timeout { .. } => {
                "service unavailable, please try again later".to_string()
            }
            AbelError::Storage { .. } | AbelError::Config(_) | AbelError::Internal(_) => {
                "internal error".to_string()
            }
        }
    }

    /// Whether the error is a client error (4xx-equivalent) rather than a
    /// service failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AbelError::Validation { .. } | AbelError::NotFound { .. })
    }
}
