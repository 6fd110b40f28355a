// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic feature-hashing embedder.
//!
//! Maps each lowercased word to a signed bucket via SHA-256 and L2-normalizes
//! the result. Needs no model and no network, so it backs the index when no
//! embedding service is available and in tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use escalate_core::error::EscalateError;
use escalate_core::traits::EmbeddingAdapter;
use escalate_core::traits::adapter::PluginAdapter;
use escalate_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

/// Bag-of-words embedder using the hashing trick.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text string.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dimensions;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        l2_normalize(&mut vector);
        vector
    }
}

/// Embed one text with any adapter.
pub(crate) async fn embed_one(
    embedder: &dyn EmbeddingAdapter,
    text: &str,
) -> Result<Vec<f32>, EscalateError> {
    let output = embedder
        .embed(EmbeddingInput {
            texts: vec![text.to_string()],
        })
        .await?;
    output
        .embeddings
        .into_iter()
        .next()
        .ok_or_else(|| EscalateError::Internal("embedding returned no results".to_string()))
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl PluginAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for HashingEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EscalateError> {
        let embeddings = input.texts.iter().map(|t| self.embed_text(t)).collect();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::cosine_similarity;

    #[test]
    fn same_text_same_vector() {
        let embedder = HashingEmbedder::new(64);
        assert_eq!(
            embedder.embed_text("Rear-end collision"),
            embedder.embed_text("rear end COLLISION")
        );
    }

    #[test]
    fn output_is_unit_length() {
        let v = HashingEmbedder::new(128).embed_text("hail damage to the roof");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(16).embed_text("  ...  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn overlapping_texts_are_closer() {
        let e = HashingEmbedder::new(256);
        let base = e.embed_text("car accident on the highway with rear damage");
        let near = e.embed_text("rear damage after a highway car accident");
        let far = e.embed_text("basement flooded after heavy rain");
        let near_sim = cosine_similarity(&base, &near).unwrap();
        let far_sim = cosine_similarity(&base, &far).unwrap_or(0.0);
        assert!(near_sim > far_sim, "near {near_sim} should beat far {far_sim}");
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let e = HashingEmbedder::new(32);
        let out = e
            .embed(EmbeddingInput {
                texts: vec!["one".into(), "two".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, 32);
        assert_eq!(out.embeddings[0], e.embed_text("one"));
        assert_eq!(out.embeddings[1], e.embed_text("two"));
    }
}
