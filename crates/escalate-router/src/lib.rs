// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query complexity classification and handler routing for Escalate.
//!
//! This crate provides:
//! - [`Classifier`]: labels a request, either by heuristic scoring or by
//!   asking a backend
//! - [`Router`]: maps a label to the local or cloud handler, honoring
//!   per-message overrides and a global force setting
//!
//! The router runs before any handler call. It never fails: every label,
//! including ones outside the known vocabulary, lands on a registered handler.

pub mod classifier;
pub mod router;

pub use classifier::{
    parse_classifier_reply, Classifier, ComplexityLabel, HeuristicClassifier, LlmClassifier,
};
pub use router::{parse_handler_override, HandlerTable, Router, RoutingDecision};
