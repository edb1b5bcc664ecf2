// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini adapters for the Abel assistant.
//!
//! [`GeminiProvider`] implements [`ProviderAdapter`] over `generateContent`;
//! [`GeminiEmbedder`] implements [`EmbeddingAdapter`] over `embedContent`
//! with distinct retrieval-document and retrieval-query task types.

pub mod client;
pub mod types;

use std::time::Duration;

use abel_config::model::GeminiConfig;
use abel_core::error::AbelError;
use abel_core::traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter};
use abel_core::types::{
    AdapterType, ChatRole, EmbeddingMode, GenerationRequest, GenerationResponse, HealthStatus,
    TokenUsage,
};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::{
    default_safety_settings, Content, EmbedContentRequest, GenerateContentRequest,
    GenerationConfig,
};

/// Resolves the API key: `gemini.api_key` from config, then the
/// `GEMINI_API_KEY` environment variable.
pub fn resolve_api_key(configured: &Option<String>) -> Result<String, AbelError> {
    if let Some(key) = configured.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AbelError::Config(
            "Gemini API key not found: set gemini.api_key in abel.toml or GEMINI_API_KEY"
                .to_string(),
        )),
    }
}

/// Gemini chat provider implementing [`ProviderAdapter`].
pub struct GeminiProvider {
    client: GeminiClient,
    model: String,
    generation_config: GenerationConfig,
    timeout: Duration,
}

impl GeminiProvider {
    /// Creates a provider from the `[gemini]` config section.
    pub fn new(config: &GeminiConfig) -> Result<Self, AbelError> {
        let api_key = resolve_api_key(&config.api_key)?;
        // Generation is never retried, whatever max_retries says.
        let client = GeminiClient::new(&api_key, &config.base_url, 0)?;
        info!(model = config.chat_model, "Gemini provider initialized");
        Ok(Self::with_client(client, config))
    }

    /// Creates a provider around an existing client.
    pub fn with_client(client: GeminiClient, config: &GeminiConfig) -> Self {
        Self {
            client,
            model: config.chat_model.clone(),
            generation_config: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            },
            timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }

    fn to_api_request(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                };
                Content::text(Some(role), turn.content.clone())
            })
            .collect();
        contents.push(Content::text(Some("user"), request.prompt.clone()));

        GenerateContentRequest {
            contents,
            system_instruction: request
                .system_instruction
                .as_ref()
                .map(|s| Content::text(None, s.clone())),
            generation_config: self.generation_config.clone(),
            safety_settings: default_safety_settings(),
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, AbelError> {
        // No probe request: generation calls are billed.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), AbelError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, AbelError> {
        let api_request = self.to_api_request(&request);
        let response = self
            .client
            .generate_content(&self.model, &api_request, self.timeout)
            .await?;

        let text = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(Content::joined_text)
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .or_else(|| response.candidates.first().and_then(|c| c.finish_reason.clone()))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(AbelError::provider(format!(
                "Gemini returned no text ({reason})"
            )));
        }

        Ok(GenerationResponse {
            text,
            model: response.model_version.unwrap_or_else(|| self.model.clone()),
            usage: response.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
        })
    }
}

/// Gemini embedding adapter implementing [`EmbeddingAdapter`].
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl GeminiEmbedder {
    /// Creates an embedder from the `[gemini]` config section.
    pub fn new(config: &GeminiConfig) -> Result<Self, AbelError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = GeminiClient::new(&api_key, &config.base_url, config.max_retries)?;
        info!(
            model = config.embedding_model,
            dimensions = config.embedding_dimensions,
            "Gemini embedder initialized"
        );
        Ok(Self::with_client(client, config))
    }

    /// Creates an embedder around an existing client.
    pub fn with_client(client: GeminiClient, config: &GeminiConfig) -> Self {
        let model = config
            .embedding_model
            .strip_prefix("models/")
            .unwrap_or(&config.embedding_model)
            .to_string();
        Self {
            client,
            model,
            dimensions: config.embedding_dimensions,
            timeout: Duration::from_secs(config.embed_timeout_secs),
        }
    }
}

fn task_type(mode: EmbeddingMode) -> &'static str {
    match mode {
        EmbeddingMode::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingMode::Query => "RETRIEVAL_QUERY",
    }
}

#[async_trait]
impl PluginAdapter for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini-embedding"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, AbelError> {
        match self.embed("health check", EmbeddingMode::Query).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), AbelError> {
        debug!("Gemini embedder shutting down");
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>, AbelError> {
        if text.trim().is_empty() {
            return Err(AbelError::validation("text", "cannot embed empty text"));
        }

        let request = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content::text(None, text),
            task_type: task_type(mode).to_string(),
        };
        let response = self
            .client
            .embed_content(&self.model, &request, self.timeout)
            .await?;

        let values = response.embedding.values;
        if values.len() != self.dimensions {
            return Err(AbelError::provider(format!(
                "embedding has {} dimensions, expected {}",
                values.len(),
                self.dimensions
            )));
        }
        debug!(mode = %mode, dimensions = values.len(), "embedding generated");
        Ok(values)
    }
}
