// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded tool-invocation sub-loop.
//!
//! While a handler asks for tools, the requested calls are executed through
//! the registry, their results appended as `tool` turns, and the handler is
//! invoked again. Tool failures become `Tool error: ...` turn text and the
//! conversation continues.

use std::sync::Arc;

use escalate_core::types::TokenUsage;
use escalate_core::{Outcome, Request, RetrievedContext, Turn};
use escalate_tools::ToolRegistry;
use tracing::{debug, warn};

use crate::handler::Handler;

/// What a tool loop run produced.
#[derive(Debug, Clone)]
pub struct ToolLoopResult {
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Assistant tool-call turns and tool results, in order.
    pub turns: Vec<Turn>,
    /// Tool rounds executed.
    pub rounds: usize,
    /// Usage summed over every handler invocation.
    pub usage: TokenUsage,
}

/// Runs a handler until it produces a terminal outcome or the round cap is hit.
pub struct ToolLoop {
    registry: Arc<ToolRegistry>,
    max_rounds: usize,
}

impl ToolLoop {
    pub fn new(registry: Arc<ToolRegistry>, max_rounds: usize) -> Self {
        Self {
            registry,
            max_rounds,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub async fn run(
        &self,
        handler: &dyn Handler,
        request: &Request,
        context: &RetrievedContext,
    ) -> ToolLoopResult {
        let mut working = request.clone();
        let base_len = working.transcript.len();
        let mut usage = TokenUsage::default();
        let mut rounds = 0;

        let outcome = loop {
            let outcome = handler.respond(&working, context).await;
            accumulate(&mut usage, outcome.usage);

            if outcome.terminal {
                break outcome;
            }

            if rounds >= self.max_rounds {
                warn!(
                    handler = handler.descriptor().name.as_str(),
                    max_rounds = self.max_rounds,
                    pending = outcome.tool_calls.len(),
                    "tool round cap reached, forcing terminal outcome"
                );
                break Outcome::answer(outcome.text).with_usage(outcome.usage);
            }

            rounds += 1;
            debug!(
                handler = handler.descriptor().name.as_str(),
                round = rounds,
                calls = outcome.tool_calls.len(),
                "executing tool calls"
            );
            working
                .transcript
                .push(Turn::assistant_with_tools(outcome.text, outcome.tool_calls.clone()));
            for call in &outcome.tool_calls {
                let output = self.registry.execute(call).await;
                working.transcript.push(Turn::tool_result(call, output.content));
            }
        };

        let turns = working.transcript.turns()[base_len..].to_vec();
        ToolLoopResult {
            outcome,
            turns,
            rounds,
            usage,
        }
    }
}

/// Add `extra` into `total`, saturating.
pub(crate) fn accumulate(total: &mut TokenUsage, extra: Option<TokenUsage>) {
    if let Some(u) = extra {
        total.input_tokens = total.input_tokens.saturating_add(u.input_tokens);
        total.output_tokens = total.output_tokens.saturating_add(u.output_tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::BackendHandler;
    use crate::retry::RetryPolicy;
    use escalate_core::types::{Role, Transcript};
    use escalate_core::Capability;
    use escalate_memory::{HashingEmbedder, InMemoryIndex};
    use escalate_test_utils::MockProvider;
    use escalate_tools::builtin::register_claim_tools;
    use serde_json::json;

    fn claims_registry() -> Arc<ToolRegistry> {
        let index = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::new(64))));
        let mut registry = ToolRegistry::new();
        register_claim_tools(&mut registry, index, 3);
        Arc::new(registry)
    }

    fn handler(provider: Arc<MockProvider>, registry: &ToolRegistry) -> BackendHandler {
        BackendHandler::new("local", Capability::LocalFast, provider, "Simple Assistant")
            .with_tools(registry.tool_definitions())
            .with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_until_terminal() {
        let registry = claims_registry();
        let provider = Arc::new(
            MockProvider::new()
                .then_tool_call("get_policy_details", json!({"policy_id": "policy123"}))
                .then_text("John Doe has a $500 deductible."),
        );
        let tool_loop = ToolLoop::new(registry.clone(), 5);
        let request = Request::new("deductible on POLICY123?", Transcript::new());

        let result = tool_loop
            .run(&handler(provider.clone(), &registry), &request, &RetrievedContext::empty())
            .await;

        assert!(result.outcome.terminal);
        assert_eq!(result.outcome.text, "John Doe has a $500 deductible.");
        assert_eq!(result.rounds, 1);
        assert_eq!(result.turns.len(), 2);
        assert_eq!(result.turns[1].role, Role::Tool);
        assert!(result.turns[1].content.contains("John Doe"));
        assert_eq!(result.usage.output_tokens, 40);

        let second = &provider.requests().await[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[2].tool_name.as_deref(), Some("get_policy_details"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_turn_and_loop_continues() {
        let registry = claims_registry();
        let provider = Arc::new(
            MockProvider::new()
                .then_tool_call("delete_everything", json!({}))
                .then_text("I cannot do that."),
        );
        let result = ToolLoop::new(registry.clone(), 5)
            .run(
                &handler(provider, &registry),
                &Request::new("q", Transcript::new()),
                &RetrievedContext::empty(),
            )
            .await;

        assert!(result.turns[1].content.starts_with("Tool error: "));
        assert_eq!(result.outcome.text, "I cannot do that.");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn cap_forces_terminal_outcome() {
        let registry = claims_registry();
        let mut provider = MockProvider::new();
        for _ in 0..10 {
            provider = provider.then_tool_call("retrieve_similar_claims", json!({"query": "hail"}));
        }
        let provider = Arc::new(provider);

        let result = ToolLoop::new(registry.clone(), 2)
            .run(
                &handler(provider.clone(), &registry),
                &Request::new("q", Transcript::new()),
                &RetrievedContext::empty(),
            )
            .await;

        assert!(result.outcome.terminal);
        assert!(result.outcome.tool_calls.is_empty());
        assert_eq!(result.rounds, 2);
        assert_eq!(provider.call_count(), 3);
        assert!(logs_contain("tool round cap reached"));
    }

    #[tokio::test]
    async fn failed_outcome_ends_loop_immediately() {
        let registry = claims_registry();
        let provider = Arc::new(
            MockProvider::new().then_failure(escalate_test_utils::FailureKind::Rejected),
        );
        let result = ToolLoop::new(registry.clone(), 5)
            .run(
                &handler(provider.clone(), &registry),
                &Request::new("q", Transcript::new()),
                &RetrievedContext::empty(),
            )
            .await;
        assert!(result.outcome.is_failure());
        assert!(result.turns.is_empty());
        assert_eq!(provider.call_count(), 1);
    }
}
