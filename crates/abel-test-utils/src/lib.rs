// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Abel integration tests.
//!
//! Provides mock adapters and a test harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock language model with queued responses and request capture
//! - [`MockEmbedder`] - Deterministic bag-of-words embedder
//! - [`FlakyBackend`] - Memory backend with switchable failures
//! - [`TestHarness`] - Full stack over a temp database

pub mod flaky_backend;
pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use flaky_backend::FlakyBackend;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::MockEmbedder;
pub use mock_provider::MockProvider;
