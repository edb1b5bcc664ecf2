// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end memory and generation tests over the test harness.

use abel_config::model::MemoryConfig;
use abel_core::AbelError;
use abel_memory::{MemoryCategory, MemoryUpdate, NewMemory, SearchQuery};
use abel_test_utils::TestHarness;

async fn harness(responses: &[&str]) -> TestHarness {
    TestHarness::builder()
        .with_mock_responses(responses.iter().map(|r| r.to_string()).collect())
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn concise_answers_scenario() {
    let h = harness(&["Short answer.", "[]"]).await;
    let entry = h
        .store
        .store(
            "alice",
            NewMemory::new(MemoryCategory::Preference, "Prefers concise answers")
                .with_importance(0.9),
        )
        .await
        .unwrap();

    let hits = h
        .store
        .search(
            "alice",
            &SearchQuery::new("Prefers concise answers").with_min_similarity(0.9),
        )
        .await
        .unwrap();
    assert_eq!(hits[0].entry.id, entry.id);
    assert!(hits[0].similarity > 0.99);

    let resp = h.chat("alice", "prefers concise answers").await.unwrap();
    assert_eq!(resp.context_used, vec!["Prefers concise answers"]);
    let instruction = h.provider.requests()[0]
        .system_instruction
        .clone()
        .unwrap();
    assert!(instruction.starts_with("You are a test assistant."));
    assert!(instruction.contains("--- PERSONAL CONTEXT ---"));
}

#[tokio::test]
async fn search_never_crosses_users() {
    let h = harness(&[]).await;
    for user in ["alice", "bob"] {
        h.store
            .store(user, NewMemory::new(MemoryCategory::Knowledge, "Speaks fluent Italian"))
            .await
            .unwrap();
    }
    let hits = h
        .store
        .search(
            "alice",
            &SearchQuery::new("Speaks fluent Italian").with_min_similarity(0.0),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.user_id, "alice");
}

#[tokio::test]
async fn retrieval_failure_degrades_to_plain_generation() {
    let h = harness(&["Plain answer."]).await;
    h.store
        .store("alice", NewMemory::new(MemoryCategory::Habit, "Bikes to work"))
        .await
        .unwrap();
    h.backend.set_fail_reads(true);

    let resp = h.chat("alice", "Bikes to work").await.unwrap();
    assert_eq!(resp.response, "Plain answer.");
    assert!(resp.context_used.is_empty());
    assert!(resp.new_learnings.is_empty());

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 1, "no extraction on the degraded path");
    assert_eq!(
        requests[0].system_instruction.as_deref(),
        Some("You are a test assistant.")
    );
}

#[tokio::test]
async fn access_bookkeeping_failure_is_absorbed() {
    let h = harness(&["Answer.", "[]"]).await;
    let entry = h
        .store
        .store("alice", NewMemory::new(MemoryCategory::Habit, "Bikes to work"))
        .await
        .unwrap();
    h.backend.set_fail_access(true);

    let resp = h.chat("alice", "Bikes to work").await.unwrap();
    assert_eq!(resp.context_used, vec!["Bikes to work"]);
    assert_eq!(h.store.get(&entry.id, "alice").await.unwrap().access_count, 0);
}

#[tokio::test]
async fn embedding_outage_fails_store_but_not_chat() {
    let h = harness(&["Still here."]).await;
    h.embedder.set_failing(true);

    let err = h
        .store
        .store("alice", NewMemory::new(MemoryCategory::Habit, "Bikes to work"))
        .await
        .unwrap_err();
    assert!(matches!(err, AbelError::ProviderUnavailable { .. }));
    assert_eq!(err.user_message(), "service unavailable, please try again later");

    let resp = h.chat("alice", "How are you today?").await.unwrap();
    assert_eq!(resp.response, "Still here.");
    assert!(resp.context_used.is_empty());
}

#[tokio::test]
async fn extracted_learnings_feed_later_turns() {
    let h = harness(&[
        "Congrats on the new job!",
        r#"[{"category": "knowledge", "content": "Works as a data engineer", "importance": 0.8}]"#,
        "Happy to help with pipelines.",
        "[]",
    ])
    .await;

    let first = h.chat("alice", "I started as a data engineer").await.unwrap();
    assert_eq!(first.new_learnings.len(), 1);

    let second = h.chat("alice", "Works as a data engineer").await.unwrap();
    assert_eq!(second.context_used, vec!["Works as a data engineer"]);
    let instruction = h.provider.requests()[2]
        .system_instruction
        .clone()
        .unwrap();
    assert!(instruction.contains("What I know about the user:\n- Works as a data engineer"));
}

#[tokio::test]
async fn clear_and_delete_are_scoped() {
    let h = harness(&[]).await;
    let a = h
        .store
        .store("alice", NewMemory::new(MemoryCategory::Context, "Visiting Tokyo in May"))
        .await
        .unwrap();
    h.store
        .store("bob", NewMemory::new(MemoryCategory::Context, "Visiting Tokyo in May"))
        .await
        .unwrap();

    assert!(matches!(
        h.store.delete(&a.id, "bob").await.unwrap_err(),
        AbelError::NotFound { .. }
    ));
    assert_eq!(h.store.clear_all("alice").await.unwrap(), 1);
    assert_eq!(h.store.get_stats("bob").await.unwrap().total, 1);
}

#[tokio::test]
async fn edits_survive_and_stats_follow() {
    let h = harness(&[]).await;
    let entry = h
        .store
        .store("alice", NewMemory::new(MemoryCategory::Preference, "Likes early meetings"))
        .await
        .unwrap();
    h.store
        .update_memory(
            &entry.id,
            "alice",
            MemoryUpdate {
                content: Some("Dislikes early meetings".into()),
                importance: None,
            },
        )
        .await
        .unwrap();
    h.store.update_importance(&entry.id, 0.9).await.unwrap();

    let stats = h.store.get_stats("alice").await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.avg_importance, 0.9);
    assert_eq!(stats.latest.unwrap().content, "Dislikes early meetings");
}

#[tokio::test]
async fn memory_disabled_uses_persona_only() {
    let h = TestHarness::builder()
        .with_memory_config(MemoryConfig {
            enabled: false,
            ..MemoryConfig::default()
        })
        .with_persona("Custom persona")
        .build()
        .await
        .unwrap();
    h.store
        .store("alice", NewMemory::new(MemoryCategory::Habit, "Bikes to work"))
        .await
        .unwrap();

    let resp = h.chat("alice", "Bikes to work").await.unwrap();
    assert_eq!(resp.response, "mock response");
    assert!(resp.context_used.is_empty());
    assert_eq!(
        h.provider.requests()[0].system_instruction.as_deref(),
        Some("Custom persona")
    );
}
