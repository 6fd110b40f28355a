// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handler routing with per-message overrides.
//!
//! Priority: per-message override > global force_handler > routing disabled > label.

use escalate_config::model::RoutingConfig;
use escalate_config::validation::MAX_SCORE;
use escalate_core::{Capability, HandlerDescriptor};
use tracing::{info, warn};

use crate::classifier::ComplexityLabel;

/// The two handlers a router can pick from.
#[derive(Debug, Clone)]
pub struct HandlerTable {
    pub local: HandlerDescriptor,
    pub cloud: HandlerDescriptor,
}

impl HandlerTable {
    pub fn get(&self, capability: Capability) -> &HandlerDescriptor {
        match capability {
            Capability::LocalFast => &self.local,
            Capability::CloudAccurate => &self.cloud,
        }
    }
}

/// Routing decision for one request.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Handler to invoke.
    pub handler: HandlerDescriptor,
    /// Classifier label, when classification ran.
    pub label: Option<ComplexityLabel>,
    /// Human-readable reason for the decision.
    pub reason: String,
}

/// Maps complexity labels to handlers through a fixed decision table.
pub struct Router {
    config: RoutingConfig,
    table: HandlerTable,
}

impl Router {
    pub fn new(config: RoutingConfig, table: HandlerTable) -> Self {
        Self { config, table }
    }

    pub fn table(&self) -> &HandlerTable {
        &self.table
    }

    /// Pure, total mapping from label to handler.
    ///
    /// | label                   | handler |
    /// |-------------------------|---------|
    /// | `Simple`                | local   |
    /// | `Complex`               | cloud   |
    /// | `Score(s)`, s < threshold | local |
    /// | `Score(s)`, threshold <= s <= 10 | cloud |
    /// | anything else           | local   |
    pub fn route(&self, label: &ComplexityLabel) -> &HandlerDescriptor {
        match label {
            ComplexityLabel::Simple => &self.table.local,
            ComplexityLabel::Complex => &self.table.cloud,
            ComplexityLabel::Score(s) if *s > MAX_SCORE => {
                warn!(score = *s, "score out of range, routing to local handler");
                &self.table.local
            }
            ComplexityLabel::Score(s) if *s >= self.config.score_threshold => &self.table.cloud,
            ComplexityLabel::Score(_) => &self.table.local,
            ComplexityLabel::Unrecognized(raw) => {
                warn!(label = raw.as_str(), "unrecognized label, routing to local handler");
                &self.table.local
            }
        }
    }

    /// Decisions that do not need a label: override prefix, forced handler,
    /// or routing switched off. `None` means the caller should classify.
    pub fn preempt(&self, message: &str) -> Option<RoutingDecision> {
        let (override_capability, _clean_text) = parse_handler_override(message);
        if let Some(capability) = override_capability {
            return Some(self.fixed(capability, "per-message override"));
        }

        if let Some(capability) = self.config.force_handler {
            return Some(self.fixed(capability, "global force_handler config"));
        }

        if !self.config.enabled {
            return Some(self.fixed(Capability::LocalFast, "routing disabled"));
        }

        None
    }

    /// Route a classified request.
    pub fn decide(&self, label: ComplexityLabel) -> RoutingDecision {
        let handler = self.route(&label).clone();
        let reason = format!("classified as {label}");
        info!(
            handler = handler.name.as_str(),
            capability = %handler.capability,
            label = %label,
            "routing decision"
        );
        RoutingDecision {
            handler,
            label: Some(label),
            reason,
        }
    }

    fn fixed(&self, capability: Capability, reason: &str) -> RoutingDecision {
        let handler = self.table.get(capability).clone();
        info!(handler = handler.name.as_str(), reason, "routing decision");
        RoutingDecision {
            handler,
            label: None,
            reason: reason.to_string(),
        }
    }
}

/// Parse a per-message handler override prefix from user input.
///
/// Supports `/local ` and `/cloud ` prefixes (with trailing space).
/// The prefix is stripped from the returned message text.
pub fn parse_handler_override(text: &str) -> (Option<Capability>, &str) {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("/local ") {
        (Some(Capability::LocalFast), rest)
    } else if let Some(rest) = trimmed.strip_prefix("/cloud ") {
        (Some(Capability::CloudAccurate), rest)
    } else {
        (None, text)
    }
}
