// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: positive bounds, URL shapes,
//! thresholds inside the classifier's score range.

use crate::diagnostic::ConfigError;
use crate::model::{EmbedderKind, EscalateConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Highest score the classifier can emit.
pub const MAX_SCORE: u8 = 10;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns all collected errors rather than stopping at the first one.
pub fn validate_config(config: &EscalateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of: {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.agent.max_tool_rounds == 0 {
        fail("agent.max_tool_rounds must be at least 1".to_string());
    }

    if config.routing.score_threshold > MAX_SCORE {
        fail(format!(
            "routing.score_threshold must be between 0 and {MAX_SCORE}, got {}",
            config.routing.score_threshold
        ));
    }

    if config.routing.length_threshold == 0 {
        fail("routing.length_threshold must be at least 1".to_string());
    }

    if config
        .routing
        .escalation_keywords
        .iter()
        .any(|k| k.trim().is_empty())
    {
        fail("routing.escalation_keywords must not contain empty entries".to_string());
    }

    if config.retry.max_attempts == 0 {
        fail("retry.max_attempts must be at least 1".to_string());
    }

    if config.retry.backoff_factor < 1.0 {
        fail(format!(
            "retry.backoff_factor must be at least 1.0, got {}",
            config.retry.backoff_factor
        ));
    }

    if config.retry.max_backoff_ms < config.retry.initial_backoff_ms {
        fail(format!(
            "retry.max_backoff_ms ({}) must not be below retry.initial_backoff_ms ({})",
            config.retry.max_backoff_ms, config.retry.initial_backoff_ms
        ));
    }

    for (key, url) in [
        ("ollama.base_url", &config.ollama.base_url),
        ("gemini.base_url", &config.gemini.base_url),
        ("tools.tavily_base_url", &config.tools.tavily_base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must start with http:// or https://"));
        }
    }

    for (key, secs) in [
        ("ollama.timeout_secs", config.ollama.timeout_secs),
        ("gemini.timeout_secs", config.gemini.timeout_secs),
    ] {
        if secs == 0 {
            fail(format!("{key} must be at least 1"));
        }
    }

    if config.memory.enabled && config.memory.database_path.trim().is_empty() {
        fail("memory.database_path must not be empty".to_string());
    }

    if config.memory.embedder == EmbedderKind::Hashing && config.memory.hashing_dimensions == 0 {
        fail("memory.hashing_dimensions must be at least 1".to_string());
    }

    if config.memory.retrieval_k == 0 {
        fail("memory.retrieval_k must be at least 1".to_string());
    }

    if config.tools.search_max_results == 0 {
        fail("tools.search_max_results must be at least 1".to_string());
    }

    if config.tools.similar_claims_k == 0 {
        fail("tools.similar_claims_k must be at least 1".to_string());
    }

    if config.batch.max_workers == 0 {
        fail("batch.max_workers must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&EscalateConfig::default()).is_ok());
    }

    #[test]
    fn score_threshold_above_range_fails() {
        let mut config = EscalateConfig::default();
        config.routing.score_threshold = 11;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "routing.score_threshold"));
    }

    #[test]
    fn zero_retry_budget_fails() {
        let mut config = EscalateConfig::default();
        config.retry.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retry.max_attempts"));
    }

    #[test]
    fn backoff_bounds_are_checked() {
        let mut config = EscalateConfig::default();
        config.retry.backoff_factor = 0.5;
        config.retry.initial_backoff_ms = 10_000;
        config.retry.max_backoff_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "retry.backoff_factor"));
        assert!(has_error(&errors, "retry.max_backoff_ms"));
    }

    #[test]
    fn bad_urls_fail() {
        let mut config = EscalateConfig::default();
        config.ollama.base_url = "localhost:11434".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "ollama.base_url"));
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let mut config = EscalateConfig::default();
        config.agent.log_level = "loud".to_string();
        config.agent.max_tool_rounds = 0;
        config.batch.max_workers = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_database_path_only_matters_when_enabled() {
        let mut config = EscalateConfig::default();
        config.memory.database_path = String::new();
        assert!(has_error(
            &validate_config(&config).unwrap_err(),
            "memory.database_path"
        ));

        config.memory.enabled = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_keyword_fails() {
        let mut config = EscalateConfig::default();
        config.routing.escalation_keywords = vec!["liability".into(), " ".into()];
        assert!(has_error(
            &validate_config(&config).unwrap_err(),
            "escalation_keywords"
        ));
    }
}
