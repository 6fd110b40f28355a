// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Escalate query router.
//!
//! Holds the trait seams every external dependency sits behind (text
//! generation, embeddings, similarity search), the shared error type, and
//! the request/outcome types that flow from classifier to quality loop.

pub mod error;
pub mod traits;
pub mod types;

pub use error::EscalateError;
pub use types::{
    AdapterType, Capability, HandlerDescriptor, HealthStatus, Outcome, Request,
    RetrievedContext, Role, ToolCall, Transcript, Turn,
};

pub use traits::{EmbeddingAdapter, PluginAdapter, ProviderAdapter, SimilarityIndex};
