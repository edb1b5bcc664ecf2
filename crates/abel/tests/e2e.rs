// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: Gemini adapters against a mock HTTP server, a real
//! on-disk SQLite database, and the full RAG pipeline.
//!
//! Each test builds an isolated stack and is order-insensitive.

use std::io::Write;
use std::sync::Arc;

use abel_config::model::AbelConfig;
use abel_core::{AbelError, EmbeddingAdapter, ProviderAdapter};
use abel_gemini::{GeminiEmbedder, GeminiProvider};
use abel_memory::prompt::EXTRACTION_SYSTEM_INSTRUCTION;
use abel_memory::{MemoryCategory, MemoryStore, NewMemory, RagPipeline, SearchQuery, SqliteBackend};
use abel_storage::Database;
use abel_test_utils::MockEmbedder;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const DIMENSIONS: usize = 64;

/// Answers `embedContent` with the deterministic bag-of-words vector of the
/// request text.
struct BagOfWordsEmbedding(MockEmbedder);

impl Respond for BagOfWordsEmbedding {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let text = body["content"]["parts"][0]["text"].as_str().unwrap_or_default();
        ResponseTemplate::new(200)
            .set_body_json(json!({"embedding": {"values": self.0.vector_for(text)}}))
    }
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
    }))
}

struct Stack {
    server: MockServer,
    store: Arc<MemoryStore>,
    pipeline: RagPipeline,
    _dir: tempfile::TempDir,
}

async fn stack(chat_reply: &str, learnings: Value) -> Stack {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:embedContent"))
        .respond_with(BagOfWordsEmbedding(MockEmbedder::new(DIMENSIONS)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": EXTRACTION_SYSTEM_INSTRUCTION}]}
        })))
        .respond_with(reply(&learnings.to_string()))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(reply(chat_reply))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = AbelConfig::default();
    config.gemini.api_key = Some("test-key".into());
    config.gemini.base_url = server.uri();
    config.gemini.embedding_dimensions = DIMENSIONS;
    config.storage.database_path = dir.path().join("abel.db").to_string_lossy().to_string();

    let database = Database::open(&config.storage.database_path, true).await.unwrap();
    let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(GeminiEmbedder::new(&config.gemini).unwrap());
    let provider: Arc<dyn ProviderAdapter> = Arc::new(GeminiProvider::new(&config.gemini).unwrap());
    let store = Arc::new(MemoryStore::new(
        Arc::new(SqliteBackend::new(database)),
        embedder,
    ));
    let pipeline = RagPipeline::new(store.clone(), provider, "You are Abel.", config.memory.clone());

    Stack {
        server,
        store,
        pipeline,
        _dir: dir,
    }
}

/// Bodies of all `generateContent` calls received, in order.
async fn generate_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().ends_with(":generateContent"))
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}

#[tokio::test]
async fn personal_context_reaches_the_model() {
    let s = stack("Keeping it short.", json!([])).await;
    s.store
        .store(
            "alice",
            NewMemory::new(MemoryCategory::Preference, "Prefers concise answers").with_importance(0.9),
        )
        .await
        .unwrap();

    let resp = s
        .pipeline
        .generate_with_context("alice", "Prefers concise answers, remember?", None)
        .await
        .unwrap();
    assert_eq!(resp.response, "Keeping it short.");
    assert_eq!(resp.context_used, vec!["Prefers concise answers"]);

    let bodies = generate_bodies(&s.server).await;
    let instruction = bodies[0]["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(instruction.starts_with("You are Abel."));
    assert!(instruction.contains("[preference] Prefers concise answers"));
    assert_eq!(bodies[0]["contents"][0]["role"], "user");
    assert_eq!(bodies[0]["safetySettings"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn learnings_round_trip_through_gemini() {
    let s = stack(
        "Enjoy Lisbon!",
        json!([{"category": "context", "content": "Is travelling to Lisbon in June", "importance": 0.7}]),
    )
    .await;

    let resp = s
        .pipeline
        .generate_with_context("alice", "I'm going to Lisbon in June", None)
        .await
        .unwrap();
    assert!(resp.context_used.is_empty());
    assert_eq!(resp.new_learnings.len(), 1);

    let hits = s
        .store
        .search(
            "alice",
            &SearchQuery::new("Is travelling to Lisbon in June").with_min_similarity(0.9),
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.metadata["auto_extracted"], true);
    assert_eq!(hits[0].entry.embedding.len(), DIMENSIONS);
}

#[tokio::test]
async fn chat_history_maps_to_gemini_roles() {
    let s = stack("Yes.", json!([])).await;
    let history = vec![
        abel_core::ChatTurn::user("Do you like jazz?"),
        abel_core::ChatTurn::assistant("I do."),
    ];
    s.pipeline
        .generate_with_context("alice", "Still?", Some(history))
        .await
        .unwrap();

    let bodies = generate_bodies(&s.server).await;
    let roles: Vec<&str> = bodies[0]["contents"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["role"].as_str())
        .collect();
    assert_eq!(roles, vec!["user", "model", "user"]);
}

#[tokio::test]
async fn generation_outage_surfaces_as_provider_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/text-embedding-004:embedContent"))
        .respond_with(BagOfWordsEmbedding(MockEmbedder::new(DIMENSIONS)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {"code": 503, "message": "overloaded", "status": "UNAVAILABLE"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = AbelConfig::default();
    config.gemini.api_key = Some("test-key".into());
    config.gemini.base_url = server.uri();
    config.gemini.embedding_dimensions = DIMENSIONS;

    let store = Arc::new(MemoryStore::new(
        Arc::new(SqliteBackend::new(Database::open_in_memory().await.unwrap())),
        Arc::new(GeminiEmbedder::new(&config.gemini).unwrap()),
    ));
    let pipeline = RagPipeline::new(
        store,
        Arc::new(GeminiProvider::new(&config.gemini).unwrap()),
        "You are Abel.",
        config.memory.clone(),
    );

    let err = pipeline
        .generate_with_context("alice", "Hello there", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AbelError::ProviderUnavailable { .. }));
    assert_eq!(err.user_message(), "service unavailable, please try again later");
}

#[tokio::test]
async fn config_file_drives_the_stack() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("from-file.db");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[assistant]
name = "abel"

[gemini]
api_key = "file-key"
embedding_dimensions = 64

[storage]
database_path = "{}"

[memory]
retrieval_limit = 3
dedup_threshold = 0.95
"#,
        db_path.to_string_lossy().replace('\\', "/")
    )
    .unwrap();

    let config = abel_config::load_and_validate_path(file.path()).unwrap();
    assert_eq!(config.memory.retrieval_limit, 3);
    assert_eq!(config.gemini.embedding_dimensions, 64);

    let database = Database::open(&config.storage.database_path, config.storage.wal_mode)
        .await
        .unwrap();
    database.ping().await.unwrap();
    assert!(db_path.exists());
}
