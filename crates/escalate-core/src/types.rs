// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the classifier, router, handlers and quality loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Embedding,
    Index,
}

// --- Conversation ---

/// Speaker of a transcript turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Backend-assigned (or locally generated) call identifier.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// Argument map as decoded from the backend reply.
    pub arguments: serde_json::Value,
}

/// One role-tagged entry of a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Tool calls issued by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool turns: the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool turns: the name of the tool that produced the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Turn {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// An assistant turn that carries the tool calls the backend asked for.
    pub fn assistant_with_tools(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// The result of executing `call`, addressed back to it by id.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// Ordered list of turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Content of the first user turn, if any.
    pub fn first_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

/// A query in flight, together with the transcript it owns.
///
/// The query is fixed at construction. Only the holder of the request
/// appends to its transcript; handlers see it by shared reference.
#[derive(Debug, Clone)]
pub struct Request {
    pub query: String,
    pub transcript: Transcript,
}

impl Request {
    /// Creates a request on top of `history`, appending the query as a user turn.
    pub fn new(query: impl Into<String>, history: Transcript) -> Self {
        let query = query.into();
        let mut transcript = history;
        transcript.push(Turn::user(query.clone()));
        Self { query, transcript }
    }
}

// --- Routing ---

/// What a handler is good for. The router only ever picks between these two.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Cheap, fast, usually local model.
    #[serde(alias = "local")]
    #[strum(to_string = "local-fast", serialize = "local")]
    LocalFast,
    /// Slower, more capable, usually hosted model.
    #[serde(alias = "cloud")]
    #[strum(to_string = "cloud-accurate", serialize = "cloud")]
    CloudAccurate,
}

/// Identity of a registered handler. Immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerDescriptor {
    pub name: String,
    pub capability: Capability,
}

impl HandlerDescriptor {
    pub fn new(name: impl Into<String>, capability: Capability) -> Self {
        Self {
            name: name.into(),
            capability,
        }
    }
}

// --- Retrieval ---

/// A similarity-index hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub content: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One advisory passage handed to a handler alongside the request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub id: String,
    pub text: String,
}

impl From<ScoredDocument> for RetrievedPassage {
    fn from(doc: ScoredDocument) -> Self {
        Self {
            id: doc.id,
            text: doc.content,
        }
    }
}

/// Passages retrieved for a request. Never mutated after retrieval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    passages: Vec<RetrievedPassage>,
}

impl RetrievedContext {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self { passages }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn passages(&self) -> &[RetrievedPassage] {
        &self.passages
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Text used inside the `CONTEXT:` block of a prompt.
    pub fn render(&self) -> String {
        if self.passages.is_empty() {
            return "No docs found.".to_string();
        }
        self.passages
            .iter()
            .map(|p| format!("[{}] {}", p.id, p.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// --- Provider ---

/// Token usage reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A tool declaration sent to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object.
    pub parameters: serde_json::Value,
}

/// A request to a text-generation backend.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    /// A one-shot prompt with no system prompt, history or tools.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Turn::user(text)],
            ..Self::default()
        }
    }
}

/// A reply from a text-generation backend.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

// --- Handler output ---

/// What a handler produced for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// False while tool calls are pending.
    pub terminal: bool,
    /// Set when the backend could not produce an answer at all.
    pub failure: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl Outcome {
    /// A terminal answer.
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
            terminal: true,
            failure: None,
            usage: None,
        }
    }

    /// A non-terminal outcome asking for tool execution.
    pub fn tool_request(text: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.into(),
            tool_calls: calls,
            terminal: false,
            failure: None,
            usage: None,
        }
    }

    /// A terminal failure carrying a descriptive message as its text.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            text: message.clone(),
            tool_calls: Vec::new(),
            terminal: true,
            failure: Some(message),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

// --- Embedding ---

/// Input to an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output of an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}
