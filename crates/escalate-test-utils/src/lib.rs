// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Escalate integration tests.
//!
//! Provides mock backends and a test harness for fast, deterministic,
//! CI-runnable tests without Ollama, Gemini or Tavily.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted text-generation backend
//! - [`TestHarness`] - Full claim assistant over mock backends and a temp index

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{FailureKind, MockProvider, DEFAULT_REPLY};
