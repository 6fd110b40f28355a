// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed similarity index with vector BLOB storage.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_rusqlite::Connection;
use tracing::debug;

use escalate_core::error::EscalateError;
use escalate_core::traits::adapter::PluginAdapter;
use escalate_core::traits::{EmbeddingAdapter, SimilarityIndex};
use escalate_core::types::{AdapterType, HealthStatus, ScoredDocument};

use crate::embedder::embed_one;
use crate::types::{blob_to_vec, cosine_similarity, short_id, top_k, vec_to_blob};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at);";

/// Helper to convert tokio_rusqlite errors into EscalateError::Storage.
fn storage_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> EscalateError {
    EscalateError::Storage {
        source: Box::new(e),
    }
}

/// One stored row, embedding decoded.
struct StoredRow {
    id: String,
    content: String,
    embedding: Vec<f32>,
    metadata: String,
}

/// Persistent similarity index in SQLite.
///
/// Every document is embedded on insert; queries embed the query text and
/// rank stored rows by cosine similarity.
pub struct SqliteIndex {
    conn: Connection,
    embedder: Arc<dyn EmbeddingAdapter>,
}

impl SqliteIndex {
    /// Open (or create) the index at `path`, creating parent directories.
    pub async fn open(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Result<Self, EscalateError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EscalateError::Storage {
                    source: Box::new(e),
                })?;
        }
        let conn = Connection::open(path)
            .await
            .map_err(|e| EscalateError::Storage {
                source: Box::new(e),
            })?;
        Self::with_connection(conn, embedder).await
    }

    /// In-memory database, mostly for tests.
    pub async fn open_in_memory(embedder: Arc<dyn EmbeddingAdapter>) -> Result<Self, EscalateError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| EscalateError::Storage {
                source: Box::new(e),
            })?;
        Self::with_connection(conn, embedder).await
    }

    async fn with_connection(
        conn: Connection,
        embedder: Arc<dyn EmbeddingAdapter>,
    ) -> Result<Self, EscalateError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(storage_err)?;
        Ok(Self { conn, embedder })
    }

    /// Number of stored documents.
    pub async fn count(&self) -> Result<usize, EscalateError> {
        self.conn
            .call(|conn| -> Result<usize, rusqlite::Error> {
                let n: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
                Ok(n as usize)
            })
            .await
            .map_err(storage_err)
    }

    async fn all_rows(&self) -> Result<Vec<StoredRow>, EscalateError> {
        self.conn
            .call(|conn| -> Result<Vec<StoredRow>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT id, content, embedding, metadata FROM documents")?;
                let rows = stmt
                    .query_map([], |row| {
                        let blob: Vec<u8> = row.get(2)?;
                        Ok(StoredRow {
                            id: row.get(0)?,
                            content: row.get(1)?,
                            embedding: blob_to_vec(&blob),
                            metadata: row.get(3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(storage_err)
    }
}

#[async_trait]
impl PluginAdapter for SqliteIndex {
    fn name(&self) -> &str {
        "sqlite-index"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Index
    }

    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        match self.count().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl SimilarityIndex for SqliteIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>, EscalateError> {
        if k == 0 {
            return Ok(vec![]);
        }
        let query_embedding = embed_one(self.embedder.as_ref(), text).await?;
        let rows = self.all_rows().await?;
        let total = rows.len();

        let scored: Vec<(f32, StoredRow)> = rows
            .into_iter()
            .filter_map(|row| {
                cosine_similarity(&query_embedding, &row.embedding).map(|score| (score, row))
            })
            .collect();

        let hits: Vec<ScoredDocument> = top_k(scored, k)
            .into_iter()
            .map(|(score, row)| ScoredDocument {
                id: row.id,
                content: row.content,
                score,
                metadata: serde_json::from_str(&row.metadata).unwrap_or_default(),
            })
            .collect();
        debug!(candidates = total, hits = hits.len(), "index query");
        Ok(hits)
    }

    async fn insert(
        &self,
        text: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, EscalateError> {
        let embedding = embed_one(self.embedder.as_ref(), text).await?;
        let id = short_id();
        let content = text.to_string();
        let blob = vec_to_blob(&embedding);
        let metadata = serde_json::to_string(&metadata)
            .map_err(|e| EscalateError::Internal(format!("metadata encoding failed: {e}")))?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let row_id = id.clone();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO documents (id, content, embedding, metadata, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![row_id, content, blob, metadata, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)?;
        debug!(id = id.as_str(), "document stored");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    fn embedder() -> Arc<dyn EmbeddingAdapter> {
        Arc::new(HashingEmbedder::new(256))
    }

    fn meta() -> HashMap<String, String> {
        HashMap::from([("source".to_string(), "user".to_string())])
    }

    #[tokio::test]
    async fn insert_returns_short_id_and_counts() {
        let index = SqliteIndex::open_in_memory(embedder()).await.unwrap();
        let id = index.insert("Car hit a pole on Main St", meta()).await.unwrap();
        assert_eq!(id.len(), 8);
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_and_keeps_metadata() {
        let index = SqliteIndex::open_in_memory(embedder()).await.unwrap();
        index
            .insert("Basement flooded after heavy rain", meta())
            .await
            .unwrap();
        let car = index
            .insert("Rear-end car collision at a traffic light", meta())
            .await
            .unwrap();
        index
            .insert("Laptop stolen from hotel room", meta())
            .await
            .unwrap();

        let hits = index.query("car collision at a light", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, car);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].metadata.get("source").map(String::as_str), Some("user"));
    }

    #[tokio::test]
    async fn query_empty_index_returns_nothing() {
        let index = SqliteIndex::open_in_memory(embedder()).await.unwrap();
        assert!(index.query("anything", 3).await.unwrap().is_empty());
        assert!(index.query("anything", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopening_file_keeps_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("claims.db");

        let id = {
            let index = SqliteIndex::open(&path, embedder()).await.unwrap();
            index.insert("Windshield cracked by hail", meta()).await.unwrap()
        };

        let index = SqliteIndex::open(&path, embedder()).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query("hail windshield", 3).await.unwrap();
        assert_eq!(hits[0].id, id);
        assert_eq!(hits[0].content, "Windshield cracked by hail");
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let index = SqliteIndex::open_in_memory(embedder()).await.unwrap();
        assert_eq!(index.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
