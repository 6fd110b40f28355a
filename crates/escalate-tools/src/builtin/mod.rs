// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in tools.
//!
//! The claim assistant gets policy lookup and similar-claim retrieval; the
//! news agent gets web search.

pub mod claims;
pub mod policy;
pub mod web_search;

pub use claims::{ingest_document, submit_claim, SimilarClaimsTool};
pub use policy::{PolicyService, PolicyTool};
pub use web_search::WebSearchTool;

use std::sync::Arc;

use escalate_core::SimilarityIndex;

use crate::ToolRegistry;

/// Registers the claim assistant's tools.
pub fn register_claim_tools(
    registry: &mut ToolRegistry,
    index: Arc<dyn SimilarityIndex>,
    similar_claims_k: usize,
) {
    registry.register(Arc::new(PolicyTool::new(PolicyService::mock())));
    registry.register(Arc::new(SimilarClaimsTool::new(index, similar_claims_k)));
}

/// Registers the news agent's tools.
pub fn register_news_tools(registry: &mut ToolRegistry, search: WebSearchTool) {
    registry.register(Arc::new(search));
}
