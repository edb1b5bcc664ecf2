// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory management subcommands.

use abel_core::AbelError;
use abel_memory::{
    MemoryCategory, MemoryEntry, MemoryStats, MemoryUpdate, Metadata, NewMemory, SearchQuery,
    SearchResult,
};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::app::App;

/// Prints `value` as pretty JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AbelError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AbelError::Internal(format!("failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

pub async fn remember(
    app: &App,
    user_id: &str,
    memory: NewMemory,
    topics: Vec<String>,
    json: bool,
) -> Result<(), AbelError> {
    let memory = if topics.is_empty() {
        memory
    } else {
        let mut metadata = memory.metadata.clone();
        metadata.insert(
            "topics".into(),
            Value::Array(topics.into_iter().map(Value::String).collect()),
        );
        memory.with_metadata(metadata)
    };
    let entry = app.store.store(user_id, memory).await?;
    if json {
        return print_json(&entry);
    }
    println!("{} {}", "remembered".green(), entry.id.dimmed());
    Ok(())
}

pub async fn search(
    app: &App,
    user_id: &str,
    query: SearchQuery,
    json: bool,
) -> Result<(), AbelError> {
    let results = app.store.search(user_id, &query).await?;
    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!("{}", "no matching memories".dimmed());
    }
    for result in &results {
        println!("{}", format_result(result));
    }
    Ok(())
}

pub async fn list(
    app: &App,
    user_id: &str,
    category: Option<MemoryCategory>,
    limit: usize,
    json: bool,
) -> Result<(), AbelError> {
    let entries = app.store.list_for_user(user_id, category, limit).await?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("{}", "no memories yet".dimmed());
    }
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    Ok(())
}

pub async fn stats(app: &App, user_id: &str, json: bool) -> Result<(), AbelError> {
    let stats = app.store.get_stats(user_id).await?;
    if json {
        return print_json(&stats);
    }
    println!("{}", format_stats(&stats));
    Ok(())
}

pub async fn update(
    app: &App,
    user_id: &str,
    id: &str,
    update: MemoryUpdate,
    json: bool,
) -> Result<(), AbelError> {
    let entry = app.store.update_memory(id, user_id, update).await?;
    if json {
        return print_json(&entry);
    }
    println!("{} {}", "updated".green(), format_entry(&entry));
    Ok(())
}

pub async fn forget(app: &App, user_id: &str, id: &str) -> Result<(), AbelError> {
    app.store.delete(id, user_id).await?;
    println!("{} {}", "forgotten".green(), id.dimmed());
    Ok(())
}

pub async fn clear(app: &App, user_id: &str, confirmed: bool) -> Result<(), AbelError> {
    if !confirmed {
        return Err(AbelError::validation(
            "clear",
            "this deletes every memory of the user; pass --yes to confirm",
        ));
    }
    let removed = app.store.clear_all(user_id).await?;
    println!("{} {removed} memories", "removed".green());
    Ok(())
}

pub async fn chat(app: &App, user_id: &str, message: &str, json: bool) -> Result<(), AbelError> {
    let response = app
        .pipeline
        .generate_with_context(user_id, message, None)
        .await?;
    if json {
        return print_json(&response);
    }
    println!("{}", response.response);
    if !response.new_learnings.is_empty() {
        let learned: Vec<&str> = response
            .new_learnings
            .iter()
            .map(|l| l.content.as_str())
            .collect();
        println!("{}", format!("learned: {}", learned.join("; ")).dimmed());
    }
    Ok(())
}

/// Topic tags stored in the entry's metadata, if any.
fn topics_of(metadata: &Metadata) -> Vec<&str> {
    match metadata.get("topics") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

pub fn format_entry(entry: &MemoryEntry) -> String {
    let mut line = format!(
        "{}  [{}] {}  (importance {:.2}, used {}x)",
        entry.id, entry.category, entry.content, entry.importance, entry.access_count
    );
    let topics = topics_of(&entry.metadata);
    if !topics.is_empty() {
        line.push_str(&format!("  #{}", topics.join(" #")));
    }
    line
}

pub fn format_result(result: &SearchResult) -> String {
    format!(
        "{:.3}  [{}] {}  {}",
        result.similarity, result.entry.category, result.entry.content, result.entry.id
    )
}

pub fn format_stats(stats: &MemoryStats) -> String {
    let mut lines = vec![
        format!("total memories: {}", stats.total),
        format!("average importance: {:.2}", stats.avg_importance),
    ];
    for (category, count) in &stats.by_category {
        lines.push(format!("  {category}: {count}"));
    }
    if let Some(entry) = &stats.most_accessed {
        lines.push(format!(
            "most used: {} ({}x)",
            entry.content, entry.access_count
        ));
    }
    if let Some(entry) = &stats.latest {
        lines.push(format!(
            "latest: {} ({})",
            entry.content,
            entry.created_at.format("%Y-%m-%d %H:%M")
        ));
    }
    lines.join("\n")
}
