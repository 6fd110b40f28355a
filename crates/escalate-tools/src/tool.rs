// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! The [`Tool`] trait is the interface every built-in tool implements. The
//! [`ToolRegistry`] is the tool executor boundary seen by the agent: it looks
//! tools up by name, produces tool declarations for backends, and turns every
//! failure into a text result so a tool call never aborts a request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use escalate_core::types::{ToolCall, ToolDefinition};
use escalate_core::EscalateError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Prefix for tool results that describe a failure.
pub const TOOL_ERROR_PREFIX: &str = "Tool error: ";

/// Output from a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Text handed back to the backend.
    pub content: String,
    /// Whether the invocation failed.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: format!("{TOOL_ERROR_PREFIX}{message}"),
            is_error: true,
        }
    }
}

/// A callable tool.
///
/// `invoke` receives the argument object the backend produced. Returning
/// `Err` is fine; the registry converts it to a `Tool error:` result.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for lookup and in tool declarations.
    fn name(&self) -> &str;

    /// Human-readable description shown to the backend.
    fn description(&self) -> &str;

    /// JSON Schema of the argument object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, EscalateError>;
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool under its `name()`, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Returns (name, description) pairs sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Tool declarations for a backend request, sorted by name.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute one tool call. Never fails: unknown tools and tool errors come
    /// back as `Tool error: ...` text.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = call.name.as_str(), "backend requested unknown tool");
            return ToolOutput::error(format!("unknown tool `{}`", call.name));
        };

        match tool.invoke(call.arguments.clone()).await {
            Ok(output) => {
                debug!(
                    tool = call.name.as_str(),
                    is_error = output.is_error,
                    bytes = output.content.len(),
                    "tool executed"
                );
                output
            }
            Err(e) => {
                warn!(tool = call.name.as_str(), error = %e, "tool failed");
                ToolOutput::error(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a required string argument.
pub(crate) fn required_str<'a>(
    input: &'a serde_json::Value,
    tool: &str,
    key: &str,
) -> Result<&'a str, EscalateError> {
    input[key].as_str().ok_or_else(|| EscalateError::Tool {
        name: tool.to_string(),
        message: format!("missing required '{key}' parameter"),
    })
}
