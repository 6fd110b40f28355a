// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query complexity classification.
//!
//! Two classifiers share the [`Classifier`] contract: a zero-cost heuristic
//! (length and keyword scoring) and one that asks a text-generation backend
//! for a one-word verdict. Neither ever fails; on any doubt they answer
//! [`ComplexityLabel::Simple`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use escalate_config::model::RoutingConfig;
use escalate_config::validation::MAX_SCORE;
use escalate_core::types::ProviderRequest;
use escalate_core::{ProviderAdapter, Request};
use tracing::{debug, warn};

/// Score given to queries that trip a length or keyword trigger.
pub const ESCALATED_SCORE: u8 = 10;

/// Score given to everything else.
pub const BASELINE_SCORE: u8 = 1;

/// Complexity label attached to a request. Computed fresh per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComplexityLabel {
    Simple,
    Complex,
    /// Bounded score, `0..=10`.
    Score(u8),
    /// Anything outside the vocabulary above, kept verbatim for logging.
    Unrecognized(String),
}

impl ComplexityLabel {
    /// Parse a raw label: `simple`, `complex` (any case) or an integer in `0..=10`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("simple") {
            return ComplexityLabel::Simple;
        }
        if trimmed.eq_ignore_ascii_case("complex") {
            return ComplexityLabel::Complex;
        }
        match trimmed.parse::<u8>() {
            Ok(score) if score <= MAX_SCORE => ComplexityLabel::Score(score),
            _ => ComplexityLabel::Unrecognized(trimmed.to_string()),
        }
    }
}

impl fmt::Display for ComplexityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityLabel::Simple => write!(f, "simple"),
            ComplexityLabel::Complex => write!(f, "complex"),
            ComplexityLabel::Score(s) => write!(f, "score:{s}"),
            ComplexityLabel::Unrecognized(raw) => write!(f, "unrecognized:{raw}"),
        }
    }
}

/// Labels a request with its complexity.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Label `request`. Never fails.
    async fn classify(&self, request: &Request) -> ComplexityLabel;
}

/// Length and keyword scoring. No backend call, no latency.
pub struct HeuristicClassifier {
    length_threshold: usize,
    /// Lowercased.
    keywords: Vec<String>,
}

impl HeuristicClassifier {
    pub fn new(length_threshold: usize, keywords: &[String]) -> Self {
        Self {
            length_threshold,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.length_threshold, &config.escalation_keywords)
    }

    /// Score `text`: [`ESCALATED_SCORE`] when it is longer than the threshold
    /// (in characters) or mentions a keyword, [`BASELINE_SCORE`] otherwise.
    pub fn score(&self, text: &str) -> u8 {
        if text.chars().count() > self.length_threshold {
            return ESCALATED_SCORE;
        }
        let lower = text.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            return ESCALATED_SCORE;
        }
        BASELINE_SCORE
    }
}

#[async_trait]
impl Classifier for HeuristicClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn classify(&self, request: &Request) -> ComplexityLabel {
        let score = self.score(&request.query);
        debug!(score, "heuristic classification");
        ComplexityLabel::Score(score)
    }
}

const CLASSIFIER_PROMPT: &str = "Classify whether the following insurance query is COMPLEX.\n\
Complex means it needs multi-step reasoning, legal interpretation, calculations, \
a comparison of several policies, or detailed analysis.\n\
Simple means a single fact lookup or a short factual answer.\n\n\
Respond with ONLY one word: SIMPLE or COMPLEX.\n\n\
Query: ";

/// Asks a backend for a one-word verdict.
///
/// Makes exactly one call per classification. An unreachable backend or an
/// unparseable reply yields [`ComplexityLabel::Simple`].
pub struct LlmClassifier {
    provider: Arc<dyn ProviderAdapter>,
}

impl LlmClassifier {
    pub fn new(provider: Arc<dyn ProviderAdapter>) -> Self {
        Self { provider }
    }

    fn prompt(query: &str) -> String {
        format!("{CLASSIFIER_PROMPT}{query}")
    }
}

/// Map a backend reply onto the closed vocabulary.
///
/// A bare label (`simple`, `complex` or a score in `0..=10`) is taken as is.
/// Otherwise a case-insensitive substring match on `simple`/`complex`; a
/// reply containing both is ambiguous. Bare `yes`/`no` answers are accepted
/// as complex/simple.
pub fn parse_classifier_reply(reply: &str) -> Option<ComplexityLabel> {
    let bare = reply.trim().trim_matches(|c: char| !c.is_alphanumeric());
    match ComplexityLabel::parse(bare) {
        ComplexityLabel::Unrecognized(_) => {}
        label => return Some(label),
    }

    let lower = reply.to_lowercase();
    match (lower.contains("complex"), lower.contains("simple")) {
        (true, false) => return Some(ComplexityLabel::Complex),
        (false, true) => return Some(ComplexityLabel::Simple),
        (true, true) => return None,
        (false, false) => {}
    }
    let first_word = lower
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()));
    match first_word {
        Some("yes") => Some(ComplexityLabel::Complex),
        Some("no") => Some(ComplexityLabel::Simple),
        _ => None,
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(&self, request: &Request) -> ComplexityLabel {
        let call = ProviderRequest {
            temperature: Some(0.0),
            ..ProviderRequest::prompt(Self::prompt(&request.query))
        };
        match self.provider.complete(call).await {
            Ok(response) => match parse_classifier_reply(&response.content) {
                Some(label) => {
                    debug!(label = %label, "llm classification");
                    label
                }
                None => {
                    warn!(
                        reply = response.content.as_str(),
                        "unparseable classifier reply, defaulting to simple"
                    );
                    ComplexityLabel::Simple
                }
            },
            Err(e) => {
                warn!(
                    backend = self.provider.name(),
                    error = %e,
                    "classifier backend failed, defaulting to simple"
                );
                ComplexityLabel::Simple
            }
        }
    }
}
