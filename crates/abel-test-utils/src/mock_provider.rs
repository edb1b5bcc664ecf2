// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language-model provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with pre-configured responses
//! and records every request it receives.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use abel_core::{
    AbelError, AdapterType, GenerationRequest, GenerationResponse, HealthStatus, PluginAdapter,
    ProviderAdapter, TokenUsage,
};
use async_trait::async_trait;

const DEFAULT_RESPONSE: &str = "mock response";

/// A mock provider that returns queued outcomes in FIFO order.
///
/// When the queue is empty, "mock response" is returned, or the configured
/// error if the provider was built with [`MockProvider::failing`].
pub struct MockProvider {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<GenerationRequest>>,
    fail_with: Option<String>,
}

struct Outcome {
    delay: Option<Duration>,
    result: Result<String, String>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    /// A provider with an empty queue.
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// A provider pre-loaded with the given responses.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::new();
        for response in responses {
            provider.push_response(response);
        }
        provider
    }

    /// A provider whose every call fails with `ProviderUnavailable(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new()
        }
    }

    /// Queue a successful response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.push(None, Ok(text.into()));
    }

    /// Queue a successful response that arrives after `delay`.
    pub fn push_delayed(&self, delay: Duration, text: impl Into<String>) {
        self.push(Some(delay), Ok(text.into()));
    }

    /// Queue a `ProviderUnavailable` failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.push(None, Err(message.into()));
    }

    fn push(&self, delay: Option<Duration>, result: Result<String, String>) {
        lock(&self.outcomes).push_back(Outcome { delay, result });
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    fn next_outcome(&self) -> Outcome {
        if let Some(outcome) = lock(&self.outcomes).pop_front() {
            return outcome;
        }
        let result = match &self.fail_with {
            Some(message) => Err(message.clone()),
            None => Ok(DEFAULT_RESPONSE.to_string()),
        };
        Outcome {
            delay: None,
            result,
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, AbelError> {
        Ok(match &self.fail_with {
            Some(message) => HealthStatus::Unhealthy(message.clone()),
            None => HealthStatus::Healthy,
        })
    }

    async fn shutdown(&self) -> Result<(), AbelError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, AbelError> {
        let input_tokens = request.prompt.split_whitespace().count() as u32;
        lock(&self.requests).push(request);

        let outcome = self.next_outcome();
        if let Some(delay) = outcome.delay {
            tokio::time::sleep(delay).await;
        }
        let text = outcome.result.map_err(AbelError::provider)?;
        Ok(GenerationResponse {
            usage: Some(TokenUsage {
                input_tokens,
                output_tokens: text.split_whitespace().count() as u32,
            }),
            text,
            model: "mock-model".to_string(),
        })
    }
}
