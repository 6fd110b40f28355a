// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Escalate query router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use escalate_core::Capability;
use serde::{Deserialize, Serialize};

/// Top-level Escalate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalateConfig {
    /// Agent identity, prompts and tool loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Classification and routing settings.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Reflect-and-retry quality loop settings.
    #[serde(default)]
    pub reflection: ReflectionConfig,

    /// Backoff for transient backend failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Local Ollama backend.
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Hosted Gemini backend.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Similarity index and retrieval settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Built-in tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// News agent settings.
    #[serde(default)]
    pub news: NewsConfig,

    /// Batch runner settings.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum tool rounds per handler invocation.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// System prompt of the local-fast handler.
    #[serde(default = "default_local_system_prompt")]
    pub local_system_prompt: String,

    /// System prompt of the cloud-accurate handler.
    #[serde(default = "default_cloud_system_prompt")]
    pub cloud_system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            max_tool_rounds: default_max_tool_rounds(),
            local_system_prompt: default_local_system_prompt(),
            cloud_system_prompt: default_cloud_system_prompt(),
        }
    }
}

fn default_agent_name() -> String {
    "escalate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_tool_rounds() -> usize {
    5
}

fn default_local_system_prompt() -> String {
    "You are a simple assistant for an insurance company. \
     Answer briefly and only from the provided context and tool results."
        .to_string()
}

fn default_cloud_system_prompt() -> String {
    "You are a senior insurance claims adjuster. \
     Analyze the provided context, policy details and similar claims carefully, \
     then give a thorough, well-reasoned answer."
        .to_string()
}

/// Which classifier labels incoming queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Length and keyword scoring, no backend call.
    #[default]
    Heuristic,
    /// One call to the local backend with a closed-vocabulary prompt.
    Llm,
}

/// Classification and routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Enable routing. When false, every query goes to the local handler.
    #[serde(default = "default_routing_enabled")]
    pub enabled: bool,

    /// Classifier implementation.
    #[serde(default)]
    pub classifier: ClassifierKind,

    /// Send every query to one handler, bypassing classification.
    #[serde(default)]
    pub force_handler: Option<Capability>,

    /// Queries longer than this many characters score as complex.
    #[serde(default = "default_length_threshold")]
    pub length_threshold: usize,

    /// Case-insensitive keywords that make a query score as complex.
    #[serde(default = "default_escalation_keywords")]
    pub escalation_keywords: Vec<String>,

    /// Scores at or above this value route to the cloud handler. The default
    /// of 6 sends every score above 5 to the cloud.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: u8,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: default_routing_enabled(),
            classifier: ClassifierKind::default(),
            force_handler: None,
            length_threshold: default_length_threshold(),
            escalation_keywords: default_escalation_keywords(),
            score_threshold: default_score_threshold(),
        }
    }
}

fn default_routing_enabled() -> bool {
    true
}

fn default_length_threshold() -> usize {
    100
}

fn default_escalation_keywords() -> Vec<String> {
    vec!["liability".to_string()]
}

fn default_score_threshold() -> u8 {
    6
}

/// Reflect-and-retry quality loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReflectionConfig {
    /// Critique answers before returning them.
    #[serde(default = "default_reflection_enabled")]
    pub enabled: bool,

    /// Maximum handler re-invocations after a `NEEDS_MORE` verdict.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for ReflectionConfig {
    fn default() -> Self {
        Self {
            enabled: default_reflection_enabled(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_reflection_enabled() -> bool {
    true
}

fn default_max_iterations() -> usize {
    2
}

/// Exponential backoff for transient backend failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Upper bound on any single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Randomize each delay by +/-50%.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_jitter() -> bool {
    true
}

/// Local Ollama backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Chat model used by the local handler, classifier and critic.
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Embedding model used by the similarity index.
    #[serde(default = "default_ollama_embedding_model")]
    pub embedding_model: String,

    /// HTTP timeout per request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature. `None` keeps the model default.
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            embedding_model: default_ollama_embedding_model(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_ollama_embedding_model() -> String {
    "mxbai-embed-large".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Hosted Gemini backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` falls back to the `GOOGLE_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used by the cloud handler.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    /// HTTP timeout per request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature. `None` keeps the model default.
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_url(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

/// Where embeddings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Ollama `/api/embed` with `ollama.embedding_model`.
    #[default]
    Ollama,
    /// Deterministic token hashing, no network.
    Hashing,
}

/// Similarity index and retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Retrieve context before handling a query.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Path to the SQLite database holding the claim index.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Embedding source.
    #[serde(default)]
    pub embedder: EmbedderKind,

    /// Vector width of the hashing embedder.
    #[serde(default = "default_hashing_dimensions")]
    pub hashing_dimensions: usize,

    /// Passages retrieved per query.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            database_path: default_database_path(),
            embedder: EmbedderKind::default(),
            hashing_dimensions: default_hashing_dimensions(),
            retrieval_k: default_retrieval_k(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("escalate").join("claims.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("claims.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_hashing_dimensions() -> usize {
    256
}

fn default_retrieval_k() -> usize {
    3
}

/// Built-in tool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Tavily API key. `None` falls back to the `TAVILY_API_KEY` environment variable.
    #[serde(default)]
    pub tavily_api_key: Option<String>,

    /// Tavily API base URL.
    #[serde(default = "default_tavily_url")]
    pub tavily_base_url: String,

    /// Results returned per web search.
    #[serde(default = "default_search_max_results")]
    pub search_max_results: usize,

    /// Claims returned by `retrieve_similar_claims`.
    #[serde(default = "default_similar_claims_k")]
    pub similar_claims_k: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_base_url: default_tavily_url(),
            search_max_results: default_search_max_results(),
            similar_claims_k: default_similar_claims_k(),
        }
    }
}

fn default_tavily_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_search_max_results() -> usize {
    6
}

fn default_similar_claims_k() -> usize {
    3
}

/// News agent configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NewsConfig {
    /// Subject used when `escalate news` is run without one.
    #[serde(default = "default_news_subject")]
    pub default_subject: String,

    /// System prompt of the news-gathering handler.
    #[serde(default = "default_news_system_prompt")]
    pub system_prompt: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            default_subject: default_news_subject(),
            system_prompt: default_news_system_prompt(),
        }
    }
}

fn default_news_subject() -> String {
    "AI agents developments".to_string()
}

fn default_news_system_prompt() -> String {
    "You are a reliable news-gathering agent. Use the web_search tool to find \
     developments from the last 24-72 hours on the requested subject. \
     Prefer primary sources, cite the URL of every item you report, and finish \
     with a concise digest of the most important points."
        .to_string()
}

/// Batch runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Queries processed concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

fn default_max_workers() -> usize {
    4
}
