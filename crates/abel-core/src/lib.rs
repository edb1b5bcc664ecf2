// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Abel assistant.
//!
//! This crate provides the adapter traits, error type, and common types
//! shared by the memory pipeline, the provider adapters, and the binary.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::AbelError;
pub use types::{
    AdapterType, ChatRole, ChatTurn, EmbeddingMode, GenerationRequest, GenerationResponse,
    HealthStatus, TokenUsage,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abel_error_has_all_variants() {
        let _validation = AbelError::validation("content", "too short");
        let _not_found = AbelError::not_found("mem-1");
        let _provider = AbelError::ProviderUnavailable {
            message: "test".into(),
            source: None,
        };
        let _storage = AbelError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _config = AbelError::Config("test".into());
        let _timeout = AbelError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = AbelError::Internal("test".into());
    }

    #[test]
    fn user_message_hides_provider_details() {
        let err = AbelError::provider("upstream returned 500: {\"secret\": \"stack\"}");
        let msg = err.user_message();
        assert!(!msg.contains("secret"));
        assert!(msg.contains("unavailable"));

        let err = AbelError::Storage {
            source: Box::new(std::io::Error::other("disk I/O error at page 42")),
        };
        assert_eq!(err.user_message(), "internal error");
    }

    #[test]
    fn user_message_keeps_validation_text() {
        let err = AbelError::validation("importance", "must be between 0 and 1");
        assert_eq!(err.user_message(), "invalid importance: must be between 0 and 1");
        assert!(err.is_client_error());
        assert!(AbelError::not_found("x").is_client_error());
        assert!(!AbelError::provider("x").is_client_error());
    }

    #[test]
    fn adapter_type_round_trip() {
        use std::str::FromStr;

        for variant in [AdapterType::Provider, AdapterType::Embedding, AdapterType::Storage] {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn chat_role_serializes_lowercase() {
        let turn = ChatTurn::assistant("hello");
        let json = serde_json::to_string(&turn).expect("should serialize");
        assert_eq!(json, r#"{"role":"assistant","content":"hello"}"#);
        assert_eq!(EmbeddingMode::Query.to_string(), "query");
    }

    #[test]
    fn generation_request_builder() {
        let req = GenerationRequest::new("hi")
            .with_system_instruction("be brief")
            .with_history(vec![ChatTurn::user("earlier")]);
        assert_eq!(req.prompt, "hi");
        assert_eq!(req.system_instruction.as_deref(), Some("be brief"));
        assert_eq!(req.history.len(), 1);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
    }
}
