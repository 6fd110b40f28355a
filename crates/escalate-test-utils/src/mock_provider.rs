// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted text-generation backend for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` by replaying a queue of
//! steps: plain replies, tool-call requests, or failures of a chosen kind.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use escalate_core::traits::adapter::PluginAdapter;
use escalate_core::traits::provider::ProviderAdapter;
use escalate_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage, ToolCall,
};
use escalate_core::EscalateError;

/// Reply used once the script is exhausted.
pub const DEFAULT_REPLY: &str = "mock response";

/// Which error a scripted failure produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused or overloaded (transient).
    Unavailable,
    /// Request timed out (transient).
    Timeout,
    /// Undecodable reply (transient).
    Malformed,
    /// Backend rejected the request (permanent).
    Rejected,
}

impl FailureKind {
    fn to_error(self, backend: &str) -> EscalateError {
        match self {
            FailureKind::Unavailable => EscalateError::unavailable(backend, "connection refused"),
            FailureKind::Timeout => EscalateError::Timeout {
                duration: Duration::from_secs(30),
            },
            FailureKind::Malformed => EscalateError::MalformedResponse {
                backend: backend.to_string(),
                message: "expected value at line 1 column 1".to_string(),
            },
            FailureKind::Rejected => EscalateError::provider(format!(
                "{backend} rejected request: HTTP 400: invalid argument"
            )),
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Fail(FailureKind),
}

/// A mock backend that replays scripted steps in FIFO order.
pub struct MockProvider {
    name: String,
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a mock provider with an empty script.
    pub fn new() -> Self {
        Self::named("mock-provider")
    }

    /// Create an empty mock provider reporting `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock provider pre-loaded with plain replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        replies
            .into_iter()
            .fold(Self::new(), |mock, reply| mock.then_text(reply))
    }

    /// Append a plain reply.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Step::Text(text.into()))
    }

    /// Append a reply requesting one tool call.
    pub fn then_tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let call = ToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.to_string(),
            arguments,
        };
        self.push(Step::ToolCalls(vec![call]))
    }

    /// Append a reply requesting several tool calls at once.
    pub fn then_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.push(Step::ToolCalls(calls))
    }

    /// Append a failure.
    pub fn then_failure(self, kind: FailureKind) -> Self {
        self.push(Step::Fail(kind))
    }

    /// Append a plain reply after construction.
    pub async fn add_reply(&self, text: impl Into<String>) {
        self.script.lock().await.push_back(Step::Text(text.into()));
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    fn push(mut self, step: Step) -> Self {
        self.script.get_mut().push_back(step);
        self
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
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EscalateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request);

        let step = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Step::Text(DEFAULT_REPLY.to_string()));

        let (content, tool_calls) = match step {
            Step::Text(text) => (text, Vec::new()),
            Step::ToolCalls(calls) => (String::new(), calls),
            Step::Fail(kind) => return Err(kind.to_error(&self.name)),
        };

        Ok(ProviderResponse {
            content,
            tool_calls,
            model: "mock-model".to_string(),
            stop_reason: Some("stop".to_string()),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_reply_when_script_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(ProviderRequest::prompt("x")).await.unwrap();
        assert_eq!(resp.content, DEFAULT_REPLY);
    }

    #[tokio::test]
    async fn steps_replay_in_order() {
        let provider = MockProvider::with_replies(["first"])
            .then_tool_call("web_search", serde_json::json!({"query": "AI"}))
            .then_failure(FailureKind::Timeout);

        assert_eq!(
            provider.complete(ProviderRequest::prompt("a")).await.unwrap().content,
            "first"
        );
        let calls = provider
            .complete(ProviderRequest::prompt("b"))
            .await
            .unwrap()
            .tool_calls;
        assert_eq!(calls[0].name, "web_search");
        let err = provider.complete(ProviderRequest::prompt("c")).await.unwrap_err();
        assert!(err.is_transient());

        assert_eq!(provider.call_count(), 3);
        let seen = provider.requests().await;
        assert_eq!(seen[2].messages[0].content, "c");
    }

    #[tokio::test]
    async fn rejected_failure_is_permanent() {
        let provider = MockProvider::named("gemini").then_failure(FailureKind::Rejected);
        let err = provider.complete(ProviderRequest::prompt("x")).await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("gemini"));
    }

    #[tokio::test]
    async fn add_reply_after_construction() {
        let provider = MockProvider::new();
        provider.add_reply("dynamic").await;
        assert_eq!(
            provider.complete(ProviderRequest::prompt("x")).await.unwrap().content,
            "dynamic"
        );
    }
}
