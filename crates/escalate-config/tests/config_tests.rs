// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Escalate configuration system.

use escalate_config::diagnostic::ConfigError;
use escalate_config::model::{ClassifierKind, EmbedderKind};
use escalate_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use escalate_core::Capability;

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_escalate_config() {
    let toml = r#"
[agent]
name = "claims-desk"
log_level = "debug"
max_tool_rounds = 3

[routing]
enabled = true
classifier = "llm"
force_handler = "local"
length_threshold = 80
escalation_keywords = ["liability", "lawsuit"]
score_threshold = 7

[reflection]
enabled = false
max_iterations = 1

[retry]
max_attempts = 4
initial_backoff_ms = 100
backoff_factor = 3.0
max_backoff_ms = 2000
jitter = false

[ollama]
base_url = "http://gpu-box:11434"
model = "llama3.1"
embedding_model = "nomic-embed-text"
timeout_secs = 30
temperature = 0.1

[gemini]
api_key = "g-123"
model = "gemini-1.5-pro"

[memory]
database_path = "/tmp/claims.db"
embedder = "hashing"
hashing_dimensions = 128
retrieval_k = 2

[tools]
tavily_api_key = "tv-123"
search_max_results = 4
similar_claims_k = 5

[news]
default_subject = "insurance regulation"

[batch]
max_workers = 8
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "claims-desk");
    assert_eq!(config.agent.max_tool_rounds, 3);
    assert_eq!(config.routing.classifier, ClassifierKind::Llm);
    assert_eq!(config.routing.force_handler, Some(Capability::LocalFast));
    assert_eq!(config.routing.escalation_keywords, vec!["liability", "lawsuit"]);
    assert_eq!(config.routing.score_threshold, 7);
    assert!(!config.reflection.enabled);
    assert_eq!(config.retry.max_attempts, 4);
    assert!(!config.retry.jitter);
    assert_eq!(config.ollama.model, "llama3.1");
    assert_eq!(config.ollama.temperature, Some(0.1));
    assert_eq!(config.gemini.api_key.as_deref(), Some("g-123"));
    assert_eq!(config.memory.embedder, EmbedderKind::Hashing);
    assert_eq!(config.tools.similar_claims_k, 5);
    assert_eq!(config.news.default_subject, "insurance regulation");
    assert_eq!(config.batch.max_workers, 8);
}

/// Sections left out keep their defaults.
#[test]
fn partial_toml_keeps_defaults() {
    let config = load_config_from_str("[agent]\nname = \"x\"\n").unwrap();
    assert_eq!(config.agent.name, "x");
    assert_eq!(config.agent.log_level, "info");
    assert_eq!(config.ollama.model, "llama3");
    assert_eq!(config.routing.score_threshold, 6);
}

/// Unknown key in a section produces an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[routing]
clasifier = "llm"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { suggestion: Some(s), .. } if s == "classifier"
        )
    });
    assert!(found, "expected a `classifier` suggestion, got: {errors:?}");
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Wrong value type produces an error.
#[test]
fn wrong_type_is_rejected() {
    let toml = r#"
[batch]
max_workers = "many"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject bad type");
    assert!(!errors.is_empty());
}

/// Semantic validation runs after deserialization.
#[test]
fn validation_errors_surface_through_load() {
    let toml = r#"
[routing]
score_threshold = 42
"#;
    let errors = load_and_validate_str(toml).expect_err("threshold out of range");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("score_threshold")
    )));
}

/// An explicit config file path is honored.
#[test]
fn explicit_path_is_loaded_and_validated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("zero attempts is invalid");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("retry.max_attempts")
    )));

    std::fs::write(&path, "[retry]\nmax_attempts = 5\n").unwrap();
    let config = load_and_validate_path(&path).unwrap();
    assert_eq!(config.retry.max_attempts, 5);
}
