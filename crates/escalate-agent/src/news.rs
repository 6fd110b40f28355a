// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! News-gathering front-end: one search-capable handler driven through the
//! tool loop and the quality loop. No classification, no retrieval.

use std::sync::Arc;

use escalate_core::{Request, RetrievedContext, Transcript};
use tracing::info;

use crate::handler::Handler;
use crate::reflect::{HandlerProducer, QualityLoop, ReflectionReport};
use crate::tool_loop::ToolLoop;

/// Reviewer persona handed to the critic for news digests.
pub const NEWS_REVIEWER: &str = "You are a strict news editor. \
Check that every item is recent, on topic and cites a source URL.";

/// Digest produced for one subject.
#[derive(Debug, Clone)]
pub struct NewsDigest {
    pub subject: String,
    pub report: ReflectionReport,
}

impl NewsDigest {
    pub fn summary(&self) -> &str {
        &self.report.outcome.text
    }

    pub fn is_failure(&self) -> bool {
        self.report.outcome.is_failure()
    }
}

pub struct NewsAgent {
    handler: Arc<dyn Handler>,
    tool_loop: ToolLoop,
    quality: QualityLoop,
}

impl NewsAgent {
    pub fn new(handler: Arc<dyn Handler>, tool_loop: ToolLoop, quality: QualityLoop) -> Self {
        Self {
            handler,
            tool_loop,
            quality,
        }
    }

    /// Search, summarize and self-review news on `subject`.
    pub async fn gather(&self, subject: &str) -> NewsDigest {
        let subject = subject.trim();
        let request = Request::new(task_for(subject), Transcript::new());
        let context = RetrievedContext::empty();
        let producer = HandlerProducer {
            handler: self.handler.as_ref(),
            tool_loop: &self.tool_loop,
            context: &context,
        };

        info!(subject, "gathering news");
        let report = self.quality.run(&producer, &request).await;
        info!(
            subject,
            invocations = report.invocations,
            tool_rounds = report.tool_rounds,
            "news digest ready"
        );

        NewsDigest {
            subject: subject.to_string(),
            report,
        }
    }
}

fn task_for(subject: &str) -> String {
    format!(
        "Find the most important news from the last 24-72 hours about: {subject}. \
         Summarize each item in one or two sentences with its source URL."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::BackendHandler;
    use crate::reflect::LlmCritic;
    use crate::retry::RetryPolicy;
    use escalate_core::Capability;
    use escalate_test_utils::MockProvider;
    use escalate_tools::ToolRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn search_then_review_then_revise() {
        let provider = Arc::new(
            MockProvider::new()
                .then_tool_call("web_search", json!({"query": "AI agents"}))
                .then_text("1. Agents shipped. (no link)")
                .then_text("1. Agents shipped. https://example.com/agents"),
        );
        let critic = Arc::new(MockProvider::with_replies([
            "NEEDS_MORE: every item needs a source URL",
            "GOOD_ENOUGH",
        ]));
        let handler: Arc<dyn Handler> = Arc::new(
            BackendHandler::new("news", Capability::CloudAccurate, provider.clone(), "news agent")
                .without_context()
                .with_retry(RetryPolicy::none()),
        );
        let agent = NewsAgent::new(
            handler,
            ToolLoop::new(Arc::new(ToolRegistry::new()), 3),
            QualityLoop::new(
                Arc::new(LlmCritic::new(critic.clone()).with_reviewer(NEWS_REVIEWER)),
                2,
            ),
        );

        let digest = agent.gather("  AI agents ").await;
        assert_eq!(digest.subject, "AI agents");
        assert!(digest.summary().contains("https://example.com/agents"));
        assert_eq!(digest.report.invocations, 2);
        assert_eq!(digest.report.tool_rounds, 1);

        let first_review = &critic.requests().await[0];
        assert!(first_review.messages[0].content.contains("AI agents"));

        let revision = provider.requests().await.pop().unwrap();
        let last = revision.messages.last().unwrap();
        assert!(last.content.contains("every item needs a source URL"));
    }
}
