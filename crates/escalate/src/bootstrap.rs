// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring from configuration to running components.
//!
//! Backends are constructed once here and injected everywhere else; nothing
//! below this module reaches for a global client.

use std::sync::Arc;

use escalate_agent::{
    BackendHandler, Handler, HandlerSet, LlmCritic, NewsAgent, Pipeline, QualityLoop,
    RetryPolicy, ToolLoop, NEWS_REVIEWER,
};
use escalate_config::credentials::{GEMINI_API_KEY_ENV, TAVILY_API_KEY_ENV};
use escalate_config::model::{ClassifierKind, EmbedderKind, EscalateConfig};
use escalate_config::{require_secret, ConfigError};
use escalate_core::{
    Capability, EmbeddingAdapter, EscalateError, ProviderAdapter, SimilarityIndex,
};
use escalate_gemini::GeminiProvider;
use escalate_memory::{open_index, ContextRetriever, HashingEmbedder};
use escalate_ollama::{OllamaEmbedder, OllamaProvider};
use escalate_router::{Classifier, HeuristicClassifier, LlmClassifier};
use escalate_tools::builtin::{register_claim_tools, register_news_tools, WebSearchTool};
use escalate_tools::ToolRegistry;
use tracing::info;

/// Why a command could not start or finish.
#[derive(Debug)]
pub enum StartupError {
    /// Rendered with miette.
    Config(Vec<ConfigError>),
    Runtime(EscalateError),
}

impl From<ConfigError> for StartupError {
    fn from(error: ConfigError) -> Self {
        StartupError::Config(vec![error])
    }
}

impl From<EscalateError> for StartupError {
    fn from(error: EscalateError) -> Self {
        StartupError::Runtime(error)
    }
}

/// The two text-generation backends.
#[derive(Clone)]
pub struct Backends {
    pub local: Arc<dyn ProviderAdapter>,
    pub cloud: Arc<dyn ProviderAdapter>,
}

impl Backends {
    /// Ollama as local, Gemini as cloud. Fails when the Gemini key is missing.
    pub fn connect(config: &EscalateConfig) -> Result<Self, StartupError> {
        let gemini_key = require_secret(
            config.gemini.api_key.as_deref(),
            "gemini.api_key",
            GEMINI_API_KEY_ENV,
        )?;
        let local: Arc<dyn ProviderAdapter> = Arc::new(OllamaProvider::new(&config.ollama)?);
        let cloud: Arc<dyn ProviderAdapter> =
            Arc::new(GeminiProvider::with_api_key(gemini_key, &config.gemini)?);
        Ok(Self { local, cloud })
    }
}

pub fn embedder(config: &EscalateConfig) -> Result<Arc<dyn EmbeddingAdapter>, EscalateError> {
    Ok(match config.memory.embedder {
        EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(&config.ollama)?),
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::new(config.memory.hashing_dimensions)),
    })
}

/// The claim index configured under `[memory]`.
pub async fn claim_index(
    config: &EscalateConfig,
) -> Result<Arc<dyn SimilarityIndex>, EscalateError> {
    open_index(&config.memory, embedder(config)?).await
}

/// Classifier -> router -> claim handlers -> quality loop.
pub fn claim_pipeline(
    config: &EscalateConfig,
    backends: &Backends,
    index: Arc<dyn SimilarityIndex>,
) -> Result<Pipeline, EscalateError> {
    let mut registry = ToolRegistry::new();
    register_claim_tools(&mut registry, index.clone(), config.tools.similar_claims_k);
    let registry = Arc::new(registry);
    let retry = RetryPolicy::from_config(&config.retry);

    let local: Arc<dyn Handler> = Arc::new(
        BackendHandler::new(
            "ollama",
            Capability::LocalFast,
            backends.local.clone(),
            config.agent.local_system_prompt.clone(),
        )
        .with_tools(registry.tool_definitions())
        .with_retry(retry.clone()),
    );
    let cloud: Arc<dyn Handler> = Arc::new(
        BackendHandler::new(
            "gemini",
            Capability::CloudAccurate,
            backends.cloud.clone(),
            config.agent.cloud_system_prompt.clone(),
        )
        .with_tools(registry.tool_definitions())
        .with_retry(retry),
    );

    let classifier: Arc<dyn Classifier> = match config.routing.classifier {
        ClassifierKind::Heuristic => Arc::new(HeuristicClassifier::from_config(&config.routing)),
        ClassifierKind::Llm => Arc::new(LlmClassifier::new(backends.local.clone())),
    };

    let mut builder = Pipeline::builder(HandlerSet::new(local, cloud)?)
        .classifier(classifier)
        .routing(config.routing.clone())
        .tools(registry, config.agent.max_tool_rounds)
        .quality(quality_loop(config, backends.local.clone(), None));
    if config.memory.enabled {
        builder = builder.retriever(ContextRetriever::from_config(index, &config.memory));
    }
    Ok(builder.build())
}

/// Search-backed news agent on the cloud backend. Fails when the Tavily key
/// is missing.
pub fn news_agent(config: &EscalateConfig, backends: &Backends) -> Result<NewsAgent, StartupError> {
    let tavily_key = require_secret(
        config.tools.tavily_api_key.as_deref(),
        "tools.tavily_api_key",
        TAVILY_API_KEY_ENV,
    )?;
    let mut registry = ToolRegistry::new();
    register_news_tools(&mut registry, WebSearchTool::new(tavily_key, &config.tools)?);
    let registry = Arc::new(registry);

    let handler: Arc<dyn Handler> = Arc::new(
        BackendHandler::new(
            "news",
            Capability::CloudAccurate,
            backends.cloud.clone(),
            config.news.system_prompt.clone(),
        )
        .without_context()
        .with_tools(registry.tool_definitions())
        .with_retry(RetryPolicy::from_config(&config.retry)),
    );

    Ok(NewsAgent::new(
        handler,
        ToolLoop::new(registry, config.agent.max_tool_rounds),
        quality_loop(config, backends.cloud.clone(), Some(NEWS_REVIEWER)),
    ))
}

fn quality_loop(
    config: &EscalateConfig,
    critic_backend: Arc<dyn ProviderAdapter>,
    reviewer: Option<&str>,
) -> QualityLoop {
    if !config.reflection.enabled {
        info!("reflection disabled by configuration");
        return QualityLoop::disabled();
    }
    let critic = match reviewer {
        Some(reviewer) => LlmCritic::new(critic_backend).with_reviewer(reviewer),
        None => LlmCritic::new(critic_backend),
    };
    QualityLoop::new(Arc::new(critic), config.reflection.max_iterations)
}
