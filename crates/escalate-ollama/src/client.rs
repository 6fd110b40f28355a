// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a local Ollama server.
//!
//! Requests are sent once. Failures are classified into transient
//! (timeout, connection refused, 429/5xx, undecodable body) and permanent
//! errors; retrying is the caller's decision.

use std::time::Duration;

use escalate_core::EscalateError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{
    ApiErrorResponse, ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, TagsResponse,
};

pub(crate) const BACKEND: &str = "ollama";

/// Thin wrapper around `reqwest::Client` bound to one Ollama base URL.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EscalateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EscalateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/chat` with `stream: false`.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, EscalateError> {
        self.post("/api/chat", request).await
    }

    /// `POST /api/embed`.
    pub async fn embed(&self, request: &EmbedRequest) -> Result<EmbedResponse, EscalateError> {
        self.post("/api/embed", request).await
    }

    /// `GET /api/tags`, used as a liveness probe.
    pub async fn tags(&self) -> Result<TagsResponse, EscalateError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        self.decode(response).await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, EscalateError> {
        let response = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        debug!(endpoint, status = %response.status(), "ollama response received");
        self.decode(response).await
    }

    async fn decode<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, EscalateError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.send_error(e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(EscalateError::from_http_status(
                BACKEND,
                status.as_u16(),
                &detail,
            ));
        }

        serde_json::from_str(&body).map_err(|e| EscalateError::MalformedResponse {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        })
    }

    fn send_error(&self, e: reqwest::Error) -> EscalateError {
        if e.is_timeout() {
            EscalateError::Timeout {
                duration: self.timeout,
            }
        } else {
            EscalateError::BackendUnavailable {
                backend: BACKEND.to_string(),
                message: format!("request to {} failed: {e}", self.base_url),
                source: Some(Box::new(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OllamaClient {
        OllamaClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn tags_lists_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "llama3:latest"}, {"name": "mxbai-embed-large:latest"}]
            })))
            .mount(&server)
            .await;

        let tags = client(&server).tags().await.unwrap();
        assert_eq!(tags.models.len(), 2);
        assert_eq!(tags.models[0].name, "llama3:latest");
    }

    #[tokio::test]
    async fn overloaded_server_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "busy"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .embed(&EmbedRequest {
                model: "m".into(),
                input: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("busy"));
    }

    #[tokio::test]
    async fn unknown_model_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "model 'm' not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .embed(&EmbedRequest {
                model: "m".into(),
                input: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("model 'm' not found"));
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = client(&server)
            .embed(&EmbedRequest {
                model: "m".into(),
                input: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EscalateError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_unavailable() {
        // Nothing listens on port 9 in the test environment.
        let client = OllamaClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.tags().await.unwrap_err();
        assert!(err.is_transient());
    }
}
