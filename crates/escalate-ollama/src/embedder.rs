// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embeddings from a local Ollama embedding model.

use std::time::Duration;

use async_trait::async_trait;
use escalate_config::model::OllamaConfig;
use escalate_core::error::EscalateError;
use escalate_core::traits::{EmbeddingAdapter, PluginAdapter};
use escalate_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

use crate::client::{OllamaClient, BACKEND};
use crate::types::EmbedRequest;

/// `EmbeddingAdapter` over `POST /api/embed`.
pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &OllamaConfig) -> Result<Self, EscalateError> {
        let client =
            OllamaClient::new(&config.base_url, Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            client,
            model: config.embedding_model.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        crate::model_health(&self.client, &self.model).await
    }
}

#[async_trait]
impl EmbeddingAdapter for OllamaEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EscalateError> {
        let expected = input.texts.len();
        let response = self
            .client
            .embed(&EmbedRequest {
                model: self.model.clone(),
                input: input.texts,
            })
            .await?;

        if response.embeddings.len() != expected {
            return Err(EscalateError::MalformedResponse {
                backend: BACKEND.to_string(),
                message: format!(
                    "expected {expected} embeddings, got {}",
                    response.embeddings.len()
                ),
            });
        }

        let dimensions = response.embeddings.first().map_or(0, Vec::len);
        Ok(EmbeddingOutput {
            embeddings: response.embeddings,
            dimensions,
        })
    }
}
