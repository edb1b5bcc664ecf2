// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Abel assistant.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Abel configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AbelConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Gemini API settings (generation and embeddings).
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Memory and RAG pipeline settings.
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantConfig {
    /// Display name of the assistant.
    #[serde(default = "default_assistant_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline persona prompt. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a markdown file containing the persona prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_assistant_name() -> String {
    "abel".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// Gemini API key. `None` falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model used for chat generation and learning extraction.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for document and query embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Dimensionality of the embedding model's vectors.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Nucleus sampling probability mass.
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Top-k sampling cutoff.
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Timeout for a single embedding call, in seconds.
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    /// Timeout for a single generation call, in seconds.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,

    /// Retries for idempotent embedding calls on transient errors.
    /// Generation calls are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            embed_timeout_secs: default_embed_timeout_secs(),
            generation_timeout_secs: default_generation_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_chat_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_embed_timeout_secs() -> u64 {
    10
}

fn default_generation_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    1
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("abel").join("abel.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("abel.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Memory and RAG pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable memory retrieval and learning. When false, chat runs without context.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Maximum memories injected into a generation prompt.
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,

    /// Minimum cosine similarity for a memory to be injected (0.0-1.0).
    #[serde(default = "default_retrieval_min_similarity")]
    pub retrieval_min_similarity: f64,

    /// How many top-importance memories are considered for the profile summary.
    #[serde(default = "default_profile_candidates")]
    pub profile_candidates: usize,

    /// Minimum importance for a memory to appear in the profile summary.
    #[serde(default = "default_profile_min_importance")]
    pub profile_min_importance: f64,

    /// Maximum lines in the profile summary.
    #[serde(default = "default_profile_max_entries")]
    pub profile_max_entries: usize,

    /// Maximum distinct topic tags carried into the prompt.
    #[serde(default = "default_max_recent_topics")]
    pub max_recent_topics: usize,

    /// Run learning extraction after each successful generation.
    #[serde(default = "default_extract_learnings")]
    pub extract_learnings: bool,

    /// Deadline for learning extraction and persisting its results, in seconds.
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,

    /// Maximum learnings persisted per conversation turn.
    #[serde(default = "default_max_learnings_per_turn")]
    pub max_learnings_per_turn: usize,

    /// Similarity at or above which an extracted learning is treated as a
    /// duplicate of an existing memory and skipped.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            retrieval_limit: default_retrieval_limit(),
            retrieval_min_similarity: default_retrieval_min_similarity(),
            profile_candidates: default_profile_candidates(),
            profile_min_importance: default_profile_min_importance(),
            profile_max_entries: default_profile_max_entries(),
            max_recent_topics: default_max_recent_topics(),
            extract_learnings: default_extract_learnings(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
            max_learnings_per_turn: default_max_learnings_per_turn(),
            dedup_threshold: default_dedup_threshold(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_retrieval_limit() -> usize {
    5
}

fn default_retrieval_min_similarity() -> f64 {
    0.5
}

fn default_profile_candidates() -> usize {
    10
}

fn default_profile_min_importance() -> f64 {
    0.7
}

fn default_profile_max_entries() -> usize {
    5
}

fn default_max_recent_topics() -> usize {
    5
}

fn default_extract_learnings() -> bool {
    true
}

fn default_extraction_timeout_secs() -> u64 {
    30
}

fn default_max_learnings_per_turn() -> usize {
    5
}

fn default_dedup_threshold() -> f64 {
    0.92
}
