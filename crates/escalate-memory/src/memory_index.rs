// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local similarity index. Contents are lost on exit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use escalate_core::error::EscalateError;
use escalate_core::traits::adapter::PluginAdapter;
use escalate_core::traits::{EmbeddingAdapter, SimilarityIndex};
use escalate_core::types::{AdapterType, HealthStatus, ScoredDocument};

use crate::embedder::embed_one;
use crate::types::{cosine_similarity, short_id, top_k};

struct Entry {
    id: String,
    content: String,
    embedding: Vec<f32>,
    metadata: HashMap<String, String>,
}

/// Same ranking as [`crate::SqliteIndex`], held in a vector.
pub struct InMemoryIndex {
    entries: RwLock<Vec<Entry>>,
    embedder: Arc<dyn EmbeddingAdapter>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn EmbeddingAdapter>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            embedder,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryIndex {
    fn name(&self) -> &str {
        "memory-index"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Index
    }

    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>, EscalateError> {
        if k == 0 {
            return Ok(vec![]);
        }
        let query_embedding = embed_one(self.embedder.as_ref(), text).await?;
        let entries = self.entries.read().await;
        let scored: Vec<(f32, &Entry)> = entries
            .iter()
            .filter_map(|e| cosine_similarity(&query_embedding, &e.embedding).map(|s| (s, e)))
            .collect();
        Ok(top_k(scored, k)
            .into_iter()
            .map(|(score, e)| ScoredDocument {
                id: e.id.clone(),
                content: e.content.clone(),
                score,
                metadata: e.metadata.clone(),
            })
            .collect())
    }

    async fn insert(
        &self,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, EscalateError> {
        let embedding = embed_one(self.embedder.as_ref(), text).await?;
        let id = short_id();
        self.entries.write().await.push(Entry {
            id: id.clone(),
            content: text.to_string(),
            embedding,
            metadata,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    fn index() -> InMemoryIndex {
        InMemoryIndex::new(Arc::new(HashingEmbedder::new(128)))
    }

    #[tokio::test]
    async fn insert_then_query() {
        let index = index();
        assert!(index.is_empty().await);
        let id = index
            .insert("Kitchen fire damaged cabinets", HashMap::new())
            .await
            .unwrap();
        index
            .insert("Bicycle stolen from garage", HashMap::new())
            .await
            .unwrap();
        assert_eq!(index.len().await, 2);

        let hits = index.query("fire in the kitchen", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
    }

    #[tokio::test]
    async fn k_caps_result_count() {
        let index = index();
        for text in ["a claim", "another claim", "third claim", "fourth claim"] {
            index.insert(text, HashMap::new()).await.unwrap();
        }
        assert_eq!(index.query("claim", 3).await.unwrap().len(), 3);
    }
}
