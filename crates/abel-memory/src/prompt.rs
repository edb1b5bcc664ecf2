// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt text: the assistant persona, the personal-context block, and the
//! learning-extraction prompt.

use crate::types::{MemoryCategory, RagContext};

const CONTEXT_HEADER: &str = "--- PERSONAL CONTEXT ---";
const CONTEXT_FOOTER: &str = "--- END CONTEXT ---";
const CONTEXT_USAGE_NOTE: &str = "Use this information to personalize your responses, \
but do not mention it explicitly unless relevant.";

/// System instruction for the extraction call.
pub const EXTRACTION_SYSTEM_INSTRUCTION: &str =
    "You are a data extraction assistant. Return only valid JSON.";

/// The default persona for an assistant called `name`.
pub fn default_persona(name: &str) -> String {
    format!(
        "You are {name}, a caring personal AI assistant.

Your goal is to be a genuine intelligent companion:
- You remember the user's preferences and habits
- You adapt to their communication style
- You anticipate their needs based on what you know about them
- You are proactive and suggest relevant things
- You treat the user as a friend, not a customer

Personality:
- Friendly but professional
- Curious and engaged
- Proactive without being intrusive
- Honest and transparent
- Adaptive to context"
    )
}

/// Renders the non-empty parts of `context`, or `None` when there are none.
pub fn build_context_section(context: &RagContext) -> Option<String> {
    let mut parts = Vec::new();

    if !context.profile_summary.is_empty() {
        parts.push(format!(
            "What I know about the user:\n{}",
            context.profile_summary
        ));
    }
    if !context.memories.is_empty() {
        let lines: Vec<String> = context
            .memories
            .iter()
            .map(|r| format!("[{}] {}", r.entry.category, r.entry.content))
            .collect();
        parts.push(format!("Relevant memories:\n{}", lines.join("\n")));
    }
    if !context.recent_topics.is_empty() {
        parts.push(format!(
            "Recent topics: {}",
            context.recent_topics.join(", ")
        ));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Persona followed by the wrapped context block, if any.
pub fn build_system_instruction(persona: &str, context: &RagContext) -> String {
    match build_context_section(context) {
        Some(section) => format!(
            "{persona}\n\n{CONTEXT_HEADER}\n{section}\n{CONTEXT_FOOTER}\n\n{CONTEXT_USAGE_NOTE}"
        ),
        None => persona.to_string(),
    }
}

/// Prompt asking the model to list durable facts learned from one exchange.
pub fn build_extraction_prompt(user_message: &str, assistant_response: &str) -> String {
    let categories: Vec<String> = MemoryCategory::ALL.iter().map(|c| c.to_string()).collect();
    format!(
        r#"Analyze this conversation and extract any new information about the user worth remembering long term.

User: {user_message}
Assistant: {assistant_response}

Return a JSON array of objects with these fields:
- "category": one of {categories}
- "content": the fact as a short standalone statement
- "importance": a number from 0.0 to 1.0

Examples:
[{{"category": "preference", "content": "Prefers concise answers", "importance": 0.7}}]
[{{"category": "habit", "content": "Goes running every morning", "importance": 0.6}}]

If there is nothing worth remembering, return []."#,
        categories = categories.join(", ")
    )
}
