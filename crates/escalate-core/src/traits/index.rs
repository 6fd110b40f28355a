// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity index trait.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::EscalateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ScoredDocument;

/// A store of documents searchable by semantic similarity.
#[async_trait]
pub trait SimilarityIndex: PluginAdapter {
    /// Returns at most `k` documents, best match first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>, EscalateError>;

    /// Stores `text` with `metadata` and returns the generated document id.
    async fn insert(
        &self,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, EscalateError>;
}
