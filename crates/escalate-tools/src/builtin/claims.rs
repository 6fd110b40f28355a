// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Claim submission and similar-claim lookup over a similarity index.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use escalate_core::{EscalateError, SimilarityIndex};
use tracing::info;

use crate::tool::{required_str, Tool, ToolOutput};

/// Reply when the index has nothing to offer.
pub const NO_SIMILAR_CLAIMS: &str = "No similar claims found.";

/// Store a claim and return its generated id.
pub async fn submit_claim(index: &dyn SimilarityIndex, text: &str) -> Result<String, EscalateError> {
    let metadata = HashMap::from([("source".to_string(), "user".to_string())]);
    let id = index.insert(text, metadata).await?;
    info!(claim_id = id.as_str(), "claim submitted");
    Ok(id)
}

/// Store a whole claim document read from `origin` (a file path) as one entry.
pub async fn ingest_document(
    index: &dyn SimilarityIndex,
    origin: &str,
    text: &str,
) -> Result<String, EscalateError> {
    let metadata = HashMap::from([
        ("source".to_string(), "document".to_string()),
        ("origin".to_string(), origin.to_string()),
    ]);
    let id = index.insert(text, metadata).await?;
    info!(claim_id = id.as_str(), origin, bytes = text.len(), "claim document ingested");
    Ok(id)
}

/// `retrieve_similar_claims(query)`.
pub struct SimilarClaimsTool {
    index: Arc<dyn SimilarityIndex>,
    k: usize,
}

impl SimilarClaimsTool {
    pub fn new(index: Arc<dyn SimilarityIndex>, k: usize) -> Self {
        Self { index, k }
    }
}

#[async_trait]
impl Tool for SimilarClaimsTool {
    fn name(&self) -> &str {
        "retrieve_similar_claims"
    }

    fn description(&self) -> &str {
        "Find previously submitted similar claims"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Description of the claim to match"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, EscalateError> {
        let query = required_str(&input, self.name(), "query")?;
        let hits = self.index.query(query, self.k).await?;
        if hits.is_empty() {
            return Ok(ToolOutput::text(NO_SIMILAR_CLAIMS));
        }
        let lines: Vec<String> = hits
            .iter()
            .map(|doc| format!("Claim {}: {}", doc.id, doc.content))
            .collect();
        Ok(ToolOutput::text(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escalate_memory::{HashingEmbedder, InMemoryIndex};
    use serde_json::json;

    fn index() -> Arc<InMemoryIndex> {
        Arc::new(InMemoryIndex::new(Arc::new(HashingEmbedder::new(128))))
    }

    #[tokio::test]
    async fn empty_index_reports_no_claims() {
        let tool = SimilarClaimsTool::new(index(), 3);
        let out = tool.invoke(json!({"query": "flood"})).await.unwrap();
        assert_eq!(out.content, NO_SIMILAR_CLAIMS);
    }

    #[tokio::test]
    async fn submitted_claims_are_listed_best_first() {
        let index = index();
        let flood = submit_claim(index.as_ref(), "Basement flooded after a storm")
            .await
            .unwrap();
        submit_claim(index.as_ref(), "Phone screen cracked").await.unwrap();
        assert_eq!(flood.len(), 8);

        let tool = SimilarClaimsTool::new(index, 3);
        let out = tool
            .invoke(json!({"query": "storm flooded my basement"}))
            .await
            .unwrap();
        let first = out.content.lines().next().unwrap();
        assert_eq!(first, format!("Claim {flood}: Basement flooded after a storm"));
        assert_eq!(out.content.lines().count(), 2);
    }

    #[tokio::test]
    async fn submitted_claims_carry_user_source() {
        let index = index();
        submit_claim(index.as_ref(), "Tree fell on garage").await.unwrap();
        let hits = index.query("tree garage", 1).await.unwrap();
        assert_eq!(hits[0].metadata.get("source").map(String::as_str), Some("user"));
    }

    #[tokio::test]
    async fn ingested_documents_record_their_origin() {
        let index = index();
        let id = ingest_document(index.as_ref(), "claims/claim_doc.txt", "Hail dented the car roof")
            .await
            .unwrap();
        let hits = index.query("hail roof", 1).await.unwrap();
        assert_eq!(hits[0].id, id);
        assert_eq!(hits[0].metadata.get("source").map(String::as_str), Some("document"));
        assert_eq!(
            hits[0].metadata.get("origin").map(String::as_str),
            Some("claims/claim_doc.txt")
        );
    }

    #[tokio::test]
    async fn k_limits_results() {
        let index = index();
        for text in ["claim one", "claim two", "claim three", "claim four", "claim five"] {
            submit_claim(index.as_ref(), text).await.unwrap();
        }
        let tool = SimilarClaimsTool::new(index, 3);
        let out = tool.invoke(json!({"query": "claim"})).await.unwrap();
        assert_eq!(out.content.lines().count(), 3);
    }
}
