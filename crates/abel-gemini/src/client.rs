// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini Generative Language API.
//!
//! Provides [`GeminiClient`] which handles request construction,
//! authentication, per-call timeouts, and transient error retry for
//! embedding calls.

use std::time::Duration;

use abel_core::AbelError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{
    ApiErrorResponse, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse,
};

/// Delay before retrying an embedding call after a transient failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// HTTP client for Gemini API communication.
///
/// Generation calls are sent exactly once. Embedding calls are idempotent and
/// are retried up to `max_retries` times on 429/5xx or transport failures.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl GeminiClient {
    /// Creates a client authenticating with `api_key` against `base_url`
    /// (e.g. `https://generativelanguage.googleapis.com/v1beta`).
    pub fn new(api_key: &str, base_url: &str, max_retries: u32) -> Result<Self, AbelError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| AbelError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AbelError::ProviderUnavailable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            retry_backoff: RETRY_BACKOFF,
        })
    }

    /// Overrides the retry delay.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Calls `models/{model}:generateContent`. Never retried.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        timeout: Duration,
    ) -> Result<GenerateContentResponse, AbelError> {
        let url = self.endpoint(model, "generateContent");
        self.send_once(&url, request, timeout)
            .await
            .map_err(AbelError::from)
    }

    /// Calls `models/{model}:embedContent`, retrying transient failures.
    pub async fn embed_content(
        &self,
        model: &str,
        request: &EmbedContentRequest,
        timeout: Duration,
    ) -> Result<EmbedContentResponse, AbelError> {
        let url = self.endpoint(model, "embedContent");
        let mut attempt = 0;
        loop {
            match self.send_once(&url, request, timeout).await {
                Ok(response) => return Ok(response),
                Err(Failure::Transient(err)) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %err, "transient embedding failure, will retry");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(failure) => return Err(failure.into()),
            }
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:{method}", self.base_url)
    }

    async fn send_once<Req, Resp>(
        &self,
        url: &str,
        body: &Req,
        timeout: Duration,
    ) -> Result<Resp, Failure>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Failure::Transient(AbelError::Timeout { duration: timeout })
                } else {
                    Failure::Transient(AbelError::ProviderUnavailable {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    })
                }
            })?;

        let status = response.status();
        debug!(status = %status, url, "Gemini response received");

        let text = response.text().await.map_err(|e| {
            Failure::Permanent(AbelError::ProviderUnavailable {
                message: format!("failed to read response body: {e}"),
                source: Some(Box::new(e)),
            })
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api_err) => format!(
                    "Gemini API error ({}): {}",
                    api_err.error.status.as_deref().unwrap_or("UNKNOWN"),
                    api_err.error.message
                ),
                Err(_) => format!("API returned {status}: {text}"),
            };
            let err = AbelError::provider(message);
            return Err(if is_transient_status(status) {
                Failure::Transient(err)
            } else {
                Failure::Permanent(err)
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            Failure::Permanent(AbelError::ProviderUnavailable {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })
        })
    }
}

/// Outcome of a single HTTP attempt, classified for the retry loop.
enum Failure {
    Transient(AbelError),
    Permanent(AbelError),
}

impl From<Failure> for AbelError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Transient(e) | Failure::Permanent(e) => e,
        }
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{default_safety_settings, Content, GenerationConfig};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new("test-api-key", base_url, 1)
            .unwrap()
            .with_retry_backoff(Duration::from_millis(10))
    }

    fn generate_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::text(Some("user"), "Hello")],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 256,
            },
            safety_settings: default_safety_settings(),
        }
    }

    fn embed_request() -> EmbedContentRequest {
        EmbedContentRequest {
            model: "models/text-embedding-004".into(),
            content: Content::text(None, "hello"),
            task_type: "RETRIEVAL_DOCUMENT".into(),
        }
    }

    #[tokio::test]
    async fn generate_content_success_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-api-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Hi!"}]}}],
                "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let resp = client
            .generate_content("gemini-test", &generate_request(), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(resp.candidates.len(), 1);
        assert_eq!(resp.usage_metadata.unwrap().prompt_token_count, 3);
    }

    #[tokio::test]
    async fn generate_content_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"code": 503, "message": "overloaded", "status": "UNAVAILABLE"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .generate_content("gemini-test", &generate_request(), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AbelError::ProviderUnavailable { .. }));
        assert!(err.to_string().contains("UNAVAILABLE"), "got: {err}");
    }

    #[tokio::test]
    async fn embed_content_retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": {"values": [0.1, 0.2, 0.3]}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let resp = client
            .embed_content("models/text-embedding-004", &embed_request(), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(resp.embedding.values, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_content_gives_up_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .embed_content("text-embedding-004", &embed_request(), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, AbelError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn embed_content_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "bad input", "status": "INVALID_ARGUMENT"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .embed_content("text-embedding-004", &embed_request(), TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("INVALID_ARGUMENT"), "got: {err}");
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .generate_content("gemini-test", &generate_request(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, AbelError::Timeout { .. }), "got: {err:?}");
    }
}
