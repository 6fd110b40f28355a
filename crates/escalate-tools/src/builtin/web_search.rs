// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Web search through the Tavily search API.
//!
//! Results come back as a JSON array of `{title, url, content}` objects so
//! the backend can cite sources.

use std::time::Duration;

use async_trait::async_trait;
use escalate_config::model::ToolsConfig;
use escalate_core::EscalateError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tool::{required_str, Tool, ToolOutput};

const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_raw_content: bool,
    include_images: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// `web_search(query)`.
pub struct WebSearchTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(api_key: String, config: &ToolsConfig) -> Result<Self, EscalateError> {
        let client = reqwest::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()
            .map_err(|e| EscalateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            api_key,
            base_url: config.tavily_base_url.trim_end_matches('/').to_string(),
            max_results: config.search_max_results,
        })
    }

    /// Run a search and return the parsed hits.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, EscalateError> {
        let body = SearchRequest {
            query,
            max_results: self.max_results,
            search_depth: "advanced",
            include_raw_content: false,
            include_images: false,
        };
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.fail(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.fail(format!("search API returned {status}: {text}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| self.fail(format!("failed to parse search response: {e}")))?;
        debug!(query, hits = parsed.results.len(), "web search");
        Ok(parsed.results)
    }

    fn fail(&self, message: String) -> EscalateError {
        EscalateError::Tool {
            name: self.name().to_string(),
            message,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for recent news and articles. Returns titles, URLs and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, EscalateError> {
        let query = required_str(&input, self.name(), "query")?;
        let results = self.search(query).await?;
        let rendered = serde_json::to_string(&results)
            .map_err(|e| self.fail(format!("failed to render results: {e}")))?;
        Ok(ToolOutput::text(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(server: &MockServer) -> WebSearchTool {
        let config = ToolsConfig {
            tavily_base_url: server.uri(),
            ..ToolsConfig::default()
        };
        WebSearchTool::new("tv-test".into(), &config).unwrap()
    }

    #[tokio::test]
    async fn search_sends_advanced_query_and_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tv-test"))
            .and(body_partial_json(json!({
                "query": "AI agents",
                "max_results": 6,
                "search_depth": "advanced",
                "include_images": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "AI agents",
                "results": [
                    {"title": "Agents ship", "url": "https://news.example/a", "content": "Agents shipped.", "score": 0.9},
                    {"title": "More agents", "url": "https://news.example/b", "content": "More.", "score": 0.7}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = tool(&server)
            .invoke(json!({"query": "AI agents"}))
            .await
            .unwrap();
        let parsed: Vec<SearchResult> = serde_json::from_str(&out.content).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].url, "https://news.example/a");
        assert_eq!(parsed[1].title, "More agents");
    }

    #[tokio::test]
    async fn api_error_becomes_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = tool(&server)
            .invoke(json!({"query": "x"}))
            .await
            .unwrap_err();
        match err {
            EscalateError::Tool { name, message } => {
                assert_eq!(name, "web_search");
                assert!(message.contains("401"));
            }
            other => panic!("expected Tool error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_results_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let out = tool(&server).invoke(json!({"query": "x"})).await.unwrap();
        assert_eq!(out.content, "[]");
    }
}
