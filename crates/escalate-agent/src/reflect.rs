// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reflect-and-retry quality loop.
//!
//! ```text
//! PRODUCE --terminal--> CRITIQUE --GoodEnough--------------------> DONE
//!    ^                     |
//!    +----NeedsMore, below cap (critique appended as a turn)
//!                          +--NeedsMore, cap reached-------------> DONE
//! ```
//!
//! A failed outcome skips CRITIQUE. An empty candidate counts as
//! `NeedsMore` without a critic call. A critic reply that is not exactly a
//! verdict token, or a critic backend failure, counts as `NeedsMore`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use escalate_core::types::{ProviderRequest, TokenUsage};
use escalate_core::{Outcome, ProviderAdapter, Request, RetrievedContext, Turn};
use tracing::{debug, info, warn};

use crate::handler::Handler;
use crate::tool_loop::{accumulate, ToolLoop, ToolLoopResult};

const GOOD_ENOUGH: &str = "GOOD_ENOUGH";
const NEEDS_MORE: &str = "NEEDS_MORE";

/// Critic verdict on a candidate response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    GoodEnough,
    NeedsMore,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::GoodEnough => f.write_str(GOOD_ENOUGH),
            Verdict::NeedsMore => f.write_str(NEEDS_MORE),
        }
    }
}

/// A verdict plus whatever the critic said besides the verdict token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Critique {
    pub verdict: Verdict,
    pub feedback: Option<String>,
}

impl Critique {
    pub fn good_enough() -> Self {
        Self {
            verdict: Verdict::GoodEnough,
            feedback: None,
        }
    }

    pub fn needs_more(feedback: Option<String>) -> Self {
        Self {
            verdict: Verdict::NeedsMore,
            feedback,
        }
    }
}

/// Closed parse of a critic reply.
///
/// After trimming whitespace, quotes and punctuation, the reply must be
/// exactly `GOOD_ENOUGH`, or start with `NEEDS_MORE` (any case). Anything
/// else, including a negated or embedded `GOOD_ENOUGH`, is `None`.
pub fn parse_verdict(reply: &str) -> Option<Verdict> {
    classify_reply(reply).map(|(verdict, _)| verdict)
}

/// Parse a critic reply, applying the `NeedsMore` default when unparseable.
pub fn interpret_reply(reply: &str) -> Critique {
    match classify_reply(reply) {
        Some((Verdict::GoodEnough, _)) => Critique::good_enough(),
        Some((Verdict::NeedsMore, feedback)) => Critique::needs_more(feedback),
        None => {
            warn!(reply, "unparseable critique, defaulting to NEEDS_MORE");
            Critique::needs_more(None)
        }
    }
}

fn is_wrapping(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.' | '!' | ':')
}

/// Verdict plus the feedback following a leading `NEEDS_MORE`.
fn classify_reply(reply: &str) -> Option<(Verdict, Option<String>)> {
    let stripped = reply.trim_matches(is_wrapping);
    // ASCII uppercasing keeps byte offsets aligned with `stripped`.
    let upper = stripped.to_ascii_uppercase();

    if upper == GOOD_ENOUGH {
        return Some((Verdict::GoodEnough, None));
    }
    if upper.starts_with(NEEDS_MORE) {
        let rest = stripped[NEEDS_MORE.len()..]
            .trim_start_matches(|c: char| is_wrapping(c) || c == '-' || c == ',')
            .trim();
        let feedback = (!rest.is_empty()).then(|| rest.to_string());
        return Some((Verdict::NeedsMore, feedback));
    }
    None
}

/// Judges a candidate response to a request subject.
#[async_trait]
pub trait Critic: Send + Sync {
    async fn critique(&self, subject: &str, candidate: &str) -> Critique;
}

const DEFAULT_REVIEWER: &str = "You are a strict reviewer of answers produced by an assistant.";

/// Asks a text-generation backend for a verdict.
pub struct LlmCritic {
    provider: Arc<dyn ProviderAdapter>,
    reviewer: String,
}

impl LlmCritic {
    pub fn new(provider: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            provider,
            reviewer: DEFAULT_REVIEWER.to_string(),
        }
    }

    /// Replace the reviewer persona at the top of the critique prompt.
    pub fn with_reviewer(mut self, reviewer: impl Into<String>) -> Self {
        self.reviewer = reviewer.into();
        self
    }

    fn prompt(&self, subject: &str, candidate: &str) -> String {
        format!(
            "{}\n\nCritique this response for \"{subject}\":\n{candidate}\n\n\
             If it is accurate and complete, respond 'GOOD_ENOUGH'.\n\
             If it is missing data or detail, respond 'NEEDS_MORE' followed by what is missing.",
            self.reviewer
        )
    }
}

#[async_trait]
impl Critic for LlmCritic {
    async fn critique(&self, subject: &str, candidate: &str) -> Critique {
        let request = ProviderRequest {
            temperature: Some(0.0),
            ..ProviderRequest::prompt(self.prompt(subject, candidate))
        };
        match self.provider.complete(request).await {
            Ok(response) => interpret_reply(&response.content),
            Err(e) => {
                warn!(
                    backend = self.provider.name(),
                    error = %e,
                    "critic backend failed, defaulting to NEEDS_MORE"
                );
                Critique::needs_more(None)
            }
        }
    }
}

/// Produces a terminal outcome for the current transcript.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, request: &Request) -> ToolLoopResult;
}

/// A routed handler driven through the tool loop.
pub struct HandlerProducer<'a> {
    pub handler: &'a dyn Handler,
    pub tool_loop: &'a ToolLoop,
    pub context: &'a RetrievedContext,
}

#[async_trait]
impl Producer for HandlerProducer<'_> {
    async fn produce(&self, request: &Request) -> ToolLoopResult {
        self.tool_loop.run(self.handler, request, self.context).await
    }
}

/// States of the quality loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    Produce,
    Critique(Outcome),
    Done(Outcome),
}

/// What the quality loop did.
#[derive(Debug, Clone)]
pub struct ReflectionReport {
    /// Last produced outcome, whatever the last verdict was.
    pub outcome: Outcome,
    /// Producer invocations, at most `max_iterations + 1`.
    pub invocations: usize,
    /// Critiques, one per CRITIQUE step.
    pub critiques: Vec<Critique>,
    /// Tool rounds over all invocations.
    pub tool_rounds: usize,
    /// Usage over all producer invocations. Critic calls are not included.
    pub usage: TokenUsage,
}

impl ReflectionReport {
    /// The last verdict, if any critique ran.
    pub fn final_verdict(&self) -> Option<Verdict> {
        self.critiques.last().map(|c| c.verdict)
    }
}

/// Critique-driven re-invocation with a fixed cap.
pub struct QualityLoop {
    critic: Option<Arc<dyn Critic>>,
    max_iterations: usize,
}

impl QualityLoop {
    /// `max_iterations` bounds re-invocations after the first production.
    pub fn new(critic: Arc<dyn Critic>, max_iterations: usize) -> Self {
        Self {
            critic: Some(critic),
            max_iterations,
        }
    }

    /// A loop that produces once and never critiques.
    pub fn disabled() -> Self {
        Self {
            critic: None,
            max_iterations: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.critic.is_some()
    }

    pub async fn run(&self, producer: &dyn Producer, request: &Request) -> ReflectionReport {
        let mut working = request.clone();
        let mut invocations = 0;
        let mut critiques = Vec::new();
        let mut tool_rounds = 0;
        let mut usage = TokenUsage::default();
        let mut state = LoopState::Produce;

        loop {
            state = match state {
                LoopState::Produce => {
                    invocations += 1;
                    let produced = producer.produce(&working).await;
                    tool_rounds += produced.rounds;
                    accumulate(&mut usage, Some(produced.usage));
                    for turn in produced.turns {
                        working.transcript.push(turn);
                    }
                    let outcome = produced.outcome;
                    if outcome.is_failure() || self.critic.is_none() {
                        LoopState::Done(outcome)
                    } else {
                        LoopState::Critique(outcome)
                    }
                }
                LoopState::Critique(outcome) => {
                    let critique = self.critique(&request.query, &outcome).await;
                    debug!(
                        iteration = invocations,
                        verdict = %critique.verdict,
                        "critique received"
                    );
                    let verdict = critique.verdict;
                    let feedback = critique.feedback.clone();
                    critiques.push(critique);

                    match verdict {
                        Verdict::GoodEnough => LoopState::Done(outcome),
                        Verdict::NeedsMore if invocations <= self.max_iterations => {
                            working.transcript.push(Turn::assistant(outcome.text));
                            working.transcript.push(Turn::user(revision_prompt(feedback)));
                            LoopState::Produce
                        }
                        Verdict::NeedsMore => {
                            info!(
                                invocations,
                                max_iterations = self.max_iterations,
                                "reflection cap reached, returning last response"
                            );
                            LoopState::Done(outcome)
                        }
                    }
                }
                LoopState::Done(outcome) => {
                    return ReflectionReport {
                        outcome,
                        invocations,
                        critiques,
                        tool_rounds,
                        usage,
                    };
                }
            };
        }
    }

    async fn critique(&self, subject: &str, outcome: &Outcome) -> Critique {
        if outcome.text.trim().is_empty() {
            debug!("empty candidate response, treating as NEEDS_MORE");
            return Critique::needs_more(None);
        }
        match &self.critic {
            Some(critic) => critic.critique(subject, &outcome.text).await,
            None => Critique::good_enough(),
        }
    }
}

fn revision_prompt(feedback: Option<String>) -> String {
    match feedback {
        Some(feedback) => format!(
            "Reflection: your previous answer needs more work. {feedback}\n\
             Research further if needed and give an improved, complete answer."
        ),
        None => "Reflection: your previous answer needs more detail. \
                 Research further if needed and give an improved, complete answer."
            .to_string(),
    }
}
