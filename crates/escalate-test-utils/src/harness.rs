// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles the full claim assistant with mock backends, a
//! temp SQLite claim index fed by the hashing embedder, the built-in claim
//! tools, the heuristic classifier and an optional mock critic. Use `ask()`
//! to drive a query through classifier, router, handler and quality loop.

use std::sync::Arc;

use escalate_agent::{
    BackendHandler, Conversation, Handler, HandlerSet, LlmCritic, Pipeline, PipelineResult,
    QualityLoop, RetryPolicy,
};
use escalate_config::model::{AgentConfig, RoutingConfig};
use escalate_core::{Capability, EscalateError, SimilarityIndex, Transcript};
use escalate_memory::{ContextRetriever, HashingEmbedder, SqliteIndex};
use escalate_router::HeuristicClassifier;
use escalate_tools::builtin::{register_claim_tools, submit_claim};
use escalate_tools::ToolRegistry;

use crate::mock_provider::MockProvider;

const EMBEDDING_DIMENSIONS: usize = 64;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    local: MockProvider,
    cloud: MockProvider,
    critic: MockProvider,
    reflection_cap: Option<usize>,
    routing: RoutingConfig,
    retry: RetryPolicy,
    retrieval_k: usize,
    max_tool_rounds: usize,
    seed_claims: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            local: MockProvider::named("ollama"),
            cloud: MockProvider::named("gemini"),
            critic: MockProvider::named("critic"),
            reflection_cap: None,
            routing: RoutingConfig::default(),
            retry: RetryPolicy::none(),
            retrieval_k: 3,
            max_tool_rounds: 5,
            seed_claims: Vec::new(),
        }
    }

    /// Script the local backend.
    pub fn with_local(mut self, provider: MockProvider) -> Self {
        self.local = provider;
        self
    }

    /// Script the cloud backend.
    pub fn with_cloud(mut self, provider: MockProvider) -> Self {
        self.cloud = provider;
        self
    }

    /// Enable reflection with a scripted critic and the given cap.
    pub fn with_critic(mut self, critic: MockProvider, max_iterations: usize) -> Self {
        self.critic = critic;
        self.reflection_cap = Some(max_iterations);
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Claims stored in the index before the first query.
    pub fn with_claims<I, S>(mut self, claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_claims.extend(claims.into_iter().map(Into::into));
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, EscalateError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| EscalateError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("claims.db");

        let embedder = Arc::new(HashingEmbedder::new(EMBEDDING_DIMENSIONS));
        let index: Arc<dyn SimilarityIndex> =
            Arc::new(SqliteIndex::open(&db_path, embedder).await?);
        for claim in &self.seed_claims {
            submit_claim(index.as_ref(), claim).await?;
        }

        let mut registry = ToolRegistry::new();
        register_claim_tools(&mut registry, index.clone(), 3);
        let registry = Arc::new(registry);

        let local = Arc::new(self.local);
        let cloud = Arc::new(self.cloud);
        let critic = Arc::new(self.critic);
        let agent = AgentConfig::default();

        let local_handler: Arc<dyn Handler> = Arc::new(
            BackendHandler::new(
                "ollama",
                Capability::LocalFast,
                local.clone(),
                agent.local_system_prompt,
            )
            .with_tools(registry.tool_definitions())
            .with_retry(self.retry.clone()),
        );
        let cloud_handler: Arc<dyn Handler> = Arc::new(
            BackendHandler::new(
                "gemini",
                Capability::CloudAccurate,
                cloud.clone(),
                agent.cloud_system_prompt,
            )
            .with_tools(registry.tool_definitions())
            .with_retry(self.retry),
        );

        let quality = match self.reflection_cap {
            Some(cap) => QualityLoop::new(Arc::new(LlmCritic::new(critic.clone())), cap),
            None => QualityLoop::disabled(),
        };

        let pipeline = Pipeline::builder(HandlerSet::new(local_handler, cloud_handler)?)
            .classifier(Arc::new(HeuristicClassifier::from_config(&self.routing)))
            .routing(self.routing)
            .retriever(ContextRetriever::new(index.clone(), self.retrieval_k))
            .tools(registry, self.max_tool_rounds)
            .quality(quality)
            .build();

        Ok(TestHarness {
            local,
            cloud,
            critic,
            index,
            pipeline,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete claim assistant over mock backends and a temp claim index.
pub struct TestHarness {
    /// Backend of the local-fast handler.
    pub local: Arc<MockProvider>,
    /// Backend of the cloud-accurate handler.
    pub cloud: Arc<MockProvider>,
    /// Backend of the critic (unused unless reflection is enabled).
    pub critic: Arc<MockProvider>,
    /// Claim index (temp SQLite, removed on drop).
    pub index: Arc<dyn SimilarityIndex>,
    pub pipeline: Pipeline,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings and unscripted backends.
    pub async fn new() -> Result<Self, EscalateError> {
        Self::builder().build().await
    }

    /// Run one query with no history.
    pub async fn ask(&self, query: &str) -> PipelineResult {
        self.pipeline.run(query, &Transcript::new()).await
    }

    /// Run one query inside `conversation`, recording the exchange.
    pub async fn ask_in(&self, conversation: &mut Conversation, query: &str) -> PipelineResult {
        conversation.ask(&self.pipeline, query).await
    }

    /// Store a claim and return its id.
    pub async fn submit_claim(&self, text: &str) -> Result<String, EscalateError> {
        submit_claim(self.index.as_ref(), text).await
    }
}
