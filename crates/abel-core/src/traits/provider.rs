// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for language-model integrations.

use async_trait::async_trait;

use crate::error::AbelError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationRequest, GenerationResponse};

/// Adapter for language-model text generation.
///
/// Generation has side effects on the provider's side (billing, logging),
/// so implementations must not retry a call that may have reached the model.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Generates a response for the request's prompt, history and system instruction.
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, AbelError>;
}
