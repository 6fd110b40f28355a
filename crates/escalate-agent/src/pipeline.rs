// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifier -> Router -> Handler (tool loop) -> Quality loop.
//!
//! Every stage runs sequentially on the caller's task. A [`Pipeline`] holds
//! no per-request state and can serve concurrent requests from shared
//! references.

use std::sync::Arc;

use escalate_config::model::RoutingConfig;
use escalate_core::{Outcome, Request, RetrievedContext, Transcript};
use escalate_memory::ContextRetriever;
use escalate_router::{
    parse_handler_override, Classifier, HeuristicClassifier, Router, RoutingDecision,
};
use escalate_tools::ToolRegistry;
use tracing::info;

use crate::handler::HandlerSet;
use crate::reflect::{HandlerProducer, QualityLoop, ReflectionReport};
use crate::tool_loop::ToolLoop;

/// Default cap on tool rounds when none is configured.
const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Result of one pass through the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Query text after any override prefix was stripped.
    pub query: String,
    pub decision: RoutingDecision,
    /// Passages retrieved ahead of the handler call.
    pub context: RetrievedContext,
    pub report: ReflectionReport,
}

impl PipelineResult {
    pub fn answer(&self) -> &str {
        &self.report.outcome.text
    }

    pub fn outcome(&self) -> &Outcome {
        &self.report.outcome
    }

    pub fn is_failure(&self) -> bool {
        self.report.outcome.is_failure()
    }
}

/// The assembled query pipeline.
pub struct Pipeline {
    classifier: Arc<dyn Classifier>,
    router: Router,
    handlers: HandlerSet,
    retriever: Option<ContextRetriever>,
    tool_loop: ToolLoop,
    quality: QualityLoop,
}

impl Pipeline {
    pub fn builder(handlers: HandlerSet) -> PipelineBuilder {
        PipelineBuilder::new(handlers)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        self.tool_loop.registry()
    }

    /// Answer `message` on top of `history`. Never fails; backend failures
    /// come back as a failure outcome in the report.
    pub async fn run(&self, message: &str, history: &Transcript) -> PipelineResult {
        let (_, clean) = parse_handler_override(message);
        let request = Request::new(clean.trim(), history.clone());

        let decision = match self.router.preempt(message) {
            Some(decision) => decision,
            None => {
                let label = self.classifier.classify(&request).await;
                self.router.decide(label)
            }
        };

        let context = match &self.retriever {
            Some(retriever) => retriever.retrieve(&request.query).await,
            None => RetrievedContext::empty(),
        };

        let handler = self.handlers.resolve(&decision.handler);
        let producer = HandlerProducer {
            handler: handler.as_ref(),
            tool_loop: &self.tool_loop,
            context: &context,
        };
        let report = self.quality.run(&producer, &request).await;

        info!(
            handler = decision.handler.name.as_str(),
            reason = decision.reason.as_str(),
            invocations = report.invocations,
            tool_rounds = report.tool_rounds,
            input_tokens = report.usage.input_tokens,
            output_tokens = report.usage.output_tokens,
            failed = report.outcome.is_failure(),
            "query answered"
        );

        PipelineResult {
            query: request.query,
            decision,
            context,
            report,
        }
    }
}

/// Builder for [`Pipeline`]. Only the handler set is required.
pub struct PipelineBuilder {
    handlers: HandlerSet,
    classifier: Option<Arc<dyn Classifier>>,
    routing: RoutingConfig,
    retriever: Option<ContextRetriever>,
    tools: Arc<ToolRegistry>,
    max_tool_rounds: usize,
    quality: QualityLoop,
}

impl PipelineBuilder {
    fn new(handlers: HandlerSet) -> Self {
        Self {
            handlers,
            classifier: None,
            routing: RoutingConfig::default(),
            retriever: None,
            tools: Arc::new(ToolRegistry::new()),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            quality: QualityLoop::disabled(),
        }
    }

    /// Classifier to label requests. Defaults to a heuristic classifier
    /// built from the routing config.
    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn retriever(mut self, retriever: ContextRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn tools(mut self, registry: Arc<ToolRegistry>, max_rounds: usize) -> Self {
        self.tools = registry;
        self.max_tool_rounds = max_rounds;
        self
    }

    pub fn quality(mut self, quality: QualityLoop) -> Self {
        self.quality = quality;
        self
    }

    pub fn build(self) -> Pipeline {
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(HeuristicClassifier::from_config(&self.routing)));
        info!(
            classifier = classifier.name(),
            routing_enabled = self.routing.enabled,
            tools = self.tools.len(),
            reflection = self.quality.is_enabled(),
            "pipeline assembled"
        );
        let router = Router::new(self.routing, self.handlers.table());
        Pipeline {
            classifier,
            router,
            handlers: self.handlers,
            retriever: self.retriever,
            tool_loop: ToolLoop::new(self.tools, self.max_tool_rounds),
            quality: self.quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BackendHandler, Handler};
    use crate::retry::RetryPolicy;
    use escalate_core::Capability;
    use escalate_test_utils::MockProvider;

    fn handlers(local: Arc<MockProvider>, cloud: Arc<MockProvider>) -> HandlerSet {
        let local: Arc<dyn Handler> = Arc::new(
            BackendHandler::new("local", Capability::LocalFast, local, "Simple Assistant")
                .with_retry(RetryPolicy::none()),
        );
        let cloud: Arc<dyn Handler> = Arc::new(
            BackendHandler::new("cloud", Capability::CloudAccurate, cloud, "Senior Adjuster")
                .with_retry(RetryPolicy::none()),
        );
        HandlerSet::new(local, cloud).unwrap()
    }

    #[tokio::test]
    async fn short_question_goes_local_and_liability_goes_cloud() {
        let local = Arc::new(MockProvider::with_replies(["local answer"]));
        let cloud = Arc::new(MockProvider::with_replies(["cloud answer"]));
        let pipeline = Pipeline::builder(handlers(local.clone(), cloud.clone())).build();

        let simple = pipeline
            .run("What happened in policy POL-991's claim?", &Transcript::new())
            .await;
        assert_eq!(simple.decision.handler.capability, Capability::LocalFast);
        assert_eq!(simple.answer(), "local answer");

        let complex = pipeline
            .run("Who bears liability for the rear-end collision?", &Transcript::new())
            .await;
        assert_eq!(complex.decision.handler.capability, Capability::CloudAccurate);
        assert_eq!(complex.answer(), "cloud answer");

        assert_eq!(local.call_count(), 1);
        assert_eq!(cloud.call_count(), 1);
    }

    #[tokio::test]
    async fn override_prefix_is_stripped_and_honored() {
        let local = Arc::new(MockProvider::new());
        let cloud = Arc::new(MockProvider::with_replies(["forced"]));
        let pipeline = Pipeline::builder(handlers(local.clone(), cloud.clone())).build();

        let result = pipeline.run("/cloud what is my deductible?", &Transcript::new()).await;
        assert_eq!(result.query, "what is my deductible?");
        assert_eq!(result.decision.reason, "per-message override");
        assert!(result.decision.label.is_none());
        assert_eq!(local.call_count(), 0);

        let sent = cloud.requests().await;
        assert_eq!(sent[0].messages[0].content, "what is my deductible?");
    }

    #[tokio::test]
    async fn routing_disabled_sends_everything_local() {
        let local = Arc::new(MockProvider::new());
        let cloud = Arc::new(MockProvider::new());
        let pipeline = Pipeline::builder(handlers(local.clone(), cloud.clone()))
            .routing(RoutingConfig {
                enabled: false,
                ..RoutingConfig::default()
            })
            .build();

        pipeline.run("explain liability in detail", &Transcript::new()).await;
        assert_eq!(local.call_count(), 1);
        assert_eq!(cloud.call_count(), 0);
    }
}
