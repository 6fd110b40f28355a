// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context retrieval ahead of a handler call.
//!
//! Retrieval is advisory: an index failure is logged and yields an empty
//! context, it never fails the request.

use std::sync::Arc;

use escalate_config::model::MemoryConfig;
use escalate_core::error::EscalateError;
use escalate_core::traits::{EmbeddingAdapter, SimilarityIndex};
use escalate_core::types::{RetrievedContext, RetrievedPassage};
use tracing::{debug, warn};

use crate::memory_index::InMemoryIndex;
use crate::store::SqliteIndex;

/// Looks up the top-k passages for a query.
pub struct ContextRetriever {
    index: Arc<dyn SimilarityIndex>,
    k: usize,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn SimilarityIndex>, k: usize) -> Self {
        Self { index, k }
    }

    pub fn from_config(index: Arc<dyn SimilarityIndex>, config: &MemoryConfig) -> Self {
        Self::new(index, config.retrieval_k)
    }

    pub fn index(&self) -> &Arc<dyn SimilarityIndex> {
        &self.index
    }

    /// Retrieve context for `query`. Never fails.
    pub async fn retrieve(&self, query: &str) -> RetrievedContext {
        match self.index.query(query, self.k).await {
            Ok(docs) => {
                debug!(hits = docs.len(), k = self.k, "context retrieved");
                RetrievedContext::new(docs.into_iter().map(RetrievedPassage::from).collect())
            }
            Err(e) => {
                warn!(error = %e, "context retrieval failed, continuing without context");
                RetrievedContext::empty()
            }
        }
    }
}

/// Build the configured index: SQLite at `memory.database_path` when memory
/// is enabled, a process-local index otherwise.
pub async fn open_index(
    config: &MemoryConfig,
    embedder: Arc<dyn EmbeddingAdapter>,
) -> Result<Arc<dyn SimilarityIndex>, EscalateError> {
    if config.enabled {
        let index = SqliteIndex::open(&config.database_path, embedder).await?;
        Ok(Arc::new(index))
    } else {
        Ok(Arc::new(InMemoryIndex::new(embedder)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use escalate_core::traits::adapter::PluginAdapter;
    use escalate_core::types::{AdapterType, HealthStatus, ScoredDocument};

    use crate::embedder::HashingEmbedder;

    struct BrokenIndex;

    #[async_trait]
    impl PluginAdapter for BrokenIndex {
        fn name(&self) -> &str {
            "broken"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Index
        }

        async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
            Ok(HealthStatus::Unhealthy("broken".into()))
        }
    }

    #[async_trait]
    impl SimilarityIndex for BrokenIndex {
        async fn query(&self, _: &str, _: usize) -> Result<Vec<ScoredDocument>, EscalateError> {
            Err(EscalateError::Storage {
                source: "disk I/O error".into(),
            })
        }

        async fn insert(&self, _: &str, _: HashMap<String, String>) -> Result<String, EscalateError> {
            Err(EscalateError::Storage {
                source: "read-only".into(),
            })
        }
    }

    #[tokio::test]
    async fn retrieval_failure_yields_empty_context() {
        let retriever = ContextRetriever::new(Arc::new(BrokenIndex), 3);
        let context = retriever.retrieve("anything").await;
        assert!(context.is_empty());
        assert_eq!(context.render(), "No docs found.");
    }

    #[tokio::test]
    async fn retrieval_returns_passages_with_ids() {
        let index = Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::new(64))));
        let id = index
            .insert("Hail cracked the windshield", HashMap::new())
            .await
            .unwrap();
        let retriever = ContextRetriever::new(index, 3);

        let context = retriever.retrieve("windshield hail").await;
        assert_eq!(context.passages().len(), 1);
        assert_eq!(
            context.render(),
            format!("[{id}] Hail cracked the windshield")
        );
    }

    #[tokio::test]
    async fn open_index_respects_enabled_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            enabled: true,
            database_path: dir.path().join("claims.db").display().to_string(),
            ..MemoryConfig::default()
        };
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(HashingEmbedder::new(32));
        let index = open_index(&config, embedder.clone()).await.unwrap();
        assert_eq!(index.name(), "sqlite-index");
        assert!(dir.path().join("claims.db").exists());

        let config = MemoryConfig {
            enabled: false,
            ..config
        };
        let index = open_index(&config, embedder).await.unwrap();
        assert_eq!(index.name(), "memory-index");
    }
}
