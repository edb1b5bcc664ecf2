// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based learning extraction from a completed exchange.

use std::str::FromStr;
use std::sync::Arc;

use abel_core::{AbelError, GenerationRequest, ProviderAdapter};
use serde_json::Value;
use tracing::{debug, warn};

use crate::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_INSTRUCTION};
use crate::types::{
    validate_content, LearningCandidate, MemoryCategory, DEFAULT_IMPORTANCE,
};

/// The extraction model's output was not a JSON array.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionParseError {
    #[error("extraction output is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("extraction output is not a JSON array")]
    NotArray,
}

/// Parses the model's answer into at most `max` candidates.
///
/// Markdown code fences are stripped. Items with an unknown category or
/// out-of-bounds content are dropped; importance defaults to 0.5 and is
/// clamped to [0, 1].
pub fn parse_learnings(
    raw: &str,
    max: usize,
) -> Result<Vec<LearningCandidate>, ExtractionParseError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let Value::Array(items) = value else {
        return Err(ExtractionParseError::NotArray);
    };

    let candidates = items
        .iter()
        .filter_map(|item| {
            let category = item
                .get("category")
                .and_then(Value::as_str)
                .and_then(|c| MemoryCategory::from_str(c.trim()).ok());
            let Some(category) = category else {
                debug!(item = %item, "dropping learning with unknown category");
                return None;
            };
            let content = item
                .get("content")
                .and_then(Value::as_str)
                .and_then(|c| validate_content(c).ok())?;
            let importance = item
                .get("importance")
                .and_then(Value::as_f64)
                .filter(|i| i.is_finite())
                .map_or(DEFAULT_IMPORTANCE, |i| i.clamp(0.0, 1.0));
            Some(LearningCandidate {
                category,
                content,
                importance,
            })
        })
        .take(max)
        .collect();
    Ok(candidates)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Mines a completed turn for facts about the user.
pub struct LearningExtractor {
    provider: Arc<dyn ProviderAdapter>,
    max_learnings: usize,
}

impl LearningExtractor {
    pub fn new(provider: Arc<dyn ProviderAdapter>, max_learnings: usize) -> Self {
        Self {
            provider,
            max_learnings,
        }
    }

    /// Asks the model for learnings. Unparseable output yields an empty list;
    /// provider errors are returned.
    pub async fn extract_learnings(
        &self,
        user_message: &str,
        assistant_response: &str,
    ) -> Result<Vec<LearningCandidate>, AbelError> {
        let request = GenerationRequest::new(build_extraction_prompt(
            user_message,
            assistant_response,
        ))
        .with_system_instruction(EXTRACTION_SYSTEM_INSTRUCTION);

        let response = self.provider.generate(request).await?;
        match parse_learnings(&response.text, self.max_learnings) {
            Ok(learnings) => {
                debug!(count = learnings.len(), "learnings extracted");
                Ok(learnings)
            }
            Err(e) => {
                warn!(error = %e, "discarding unparseable extraction output");
                debug!(raw = %response.text, "raw extraction output");
                Ok(Vec::new())
            }
        }
    }
}
