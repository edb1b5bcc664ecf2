// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as probability ranges, non-zero limits, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::AbelConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Embedding calls are retried at most this many times.
pub const MAX_EMBED_RETRIES: u32 = 1;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AbelConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.assistant.name.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "assistant.name must not be empty".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.assistant.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "assistant.log_level `{}` is not one of {}",
                config.assistant.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let gemini = &config.gemini;
    if gemini.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "gemini.base_url must not be empty".to_string(),
        });
    }
    if gemini.embedding_dimensions == 0 {
        errors.push(ConfigError::Validation {
            message: "gemini.embedding_dimensions must be at least 1".to_string(),
        });
    }
    if !(0.0..=2.0).contains(&gemini.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "gemini.temperature must be between 0.0 and 2.0, got {}",
                gemini.temperature
            ),
        });
    }
    check_unit_range(&mut errors, "gemini.top_p", gemini.top_p);
    if gemini.max_output_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "gemini.max_output_tokens must be at least 1".to_string(),
        });
    }
    if gemini.max_retries > MAX_EMBED_RETRIES {
        errors.push(ConfigError::Validation {
            message: format!(
                "gemini.max_retries must be at most {MAX_EMBED_RETRIES}, got {}",
                gemini.max_retries
            ),
        });
    }
    check_nonzero_secs(&mut errors, "gemini.embed_timeout_secs", gemini.embed_timeout_secs);
    check_nonzero_secs(
        &mut errors,
        "gemini.generation_timeout_secs",
        gemini.generation_timeout_secs,
    );

    let memory = &config.memory;
    if memory.retrieval_limit == 0 || memory.retrieval_limit > 20 {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.retrieval_limit must be between 1 and 20, got {}",
                memory.retrieval_limit
            ),
        });
    }
    check_unit_range(
        &mut errors,
        "memory.retrieval_min_similarity",
        memory.retrieval_min_similarity,
    );
    check_unit_range(
        &mut errors,
        "memory.profile_min_importance",
        memory.profile_min_importance,
    );
    check_unit_range(&mut errors, "memory.dedup_threshold", memory.dedup_threshold);
    check_nonzero_secs(
        &mut errors,
        "memory.extraction_timeout_secs",
        memory.extraction_timeout_secs,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unit_range(errors: &mut Vec<ConfigError>, key: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigError::Validation {
            message: format!("{key} must be between 0.0 and 1.0, got {value}"),
        });
    }
}

fn check_nonzero_secs(errors: &mut Vec<ConfigError>, key: &str, value: u64) {
    if value == 0 {
        errors.push(ConfigError::Validation {
            message: format!("{key} must be at least 1 second"),
        });
    }
}
