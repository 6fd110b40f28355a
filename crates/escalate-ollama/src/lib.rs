// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama backend for Escalate.
//!
//! [`OllamaProvider`] is the "local-fast" text-generation backend
//! (`/api/chat`, tool calling included); [`OllamaEmbedder`] produces
//! embeddings for the claims index (`/api/embed`).

pub mod client;
pub mod embedder;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use escalate_config::model::OllamaConfig;
use escalate_core::error::EscalateError;
use escalate_core::traits::{PluginAdapter, ProviderAdapter};
use escalate_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, TokenUsage, ToolCall, Turn,
};
use tracing::{debug, info};

pub use client::OllamaClient;
pub use embedder::OllamaEmbedder;

use crate::types::{
    ChatFunction, ChatMessage, ChatOptions, ChatRequest, ChatResponse, ChatTool, ChatToolCall,
    ChatToolCallFunction,
};

/// Ollama chat backend implementing [`ProviderAdapter`].
pub struct OllamaProvider {
    client: OllamaClient,
    model: String,
    temperature: Option<f32>,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self, EscalateError> {
        let client =
            OllamaClient::new(&config.base_url, Duration::from_secs(config.timeout_secs))?;
        info!(
            model = config.model.as_str(),
            base_url = client.base_url(),
            "Ollama provider initialized"
        );
        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_chat_request(&self, request: &ProviderRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".into(),
                content: system.clone(),
                tool_calls: vec![],
                tool_name: None,
            });
        }
        messages.extend(request.messages.iter().map(to_chat_message));

        let tools = request
            .tools
            .iter()
            .map(|t| ChatTool {
                kind: "function",
                function: ChatFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect();

        let temperature = request.temperature.or(self.temperature);
        let options = (temperature.is_some() || request.max_tokens.is_some()).then(|| ChatOptions {
            temperature,
            num_predict: request.max_tokens,
        });

        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            tools,
            options,
        }
    }
}

fn to_chat_message(turn: &Turn) -> ChatMessage {
    ChatMessage {
        role: turn.role.to_string(),
        content: turn.content.clone(),
        tool_calls: turn
            .tool_calls
            .iter()
            .map(|c| ChatToolCall {
                function: ChatToolCallFunction {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                },
            })
            .collect(),
        tool_name: turn.tool_name.clone(),
    }
}

/// Some models return arguments as a JSON-encoded string.
fn normalize_arguments(arguments: serde_json::Value) -> serde_json::Value {
    match arguments {
        serde_json::Value::String(s) => {
            serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
        }
        serde_json::Value::Null => serde_json::json!({}),
        other => other,
    }
}

fn from_chat_response(response: ChatResponse) -> ProviderResponse {
    let tool_calls = response
        .message
        .tool_calls
        .into_iter()
        .map(|c| ToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: c.function.name,
            arguments: normalize_arguments(c.function.arguments),
        })
        .collect();

    let usage = match (response.prompt_eval_count, response.eval_count) {
        (None, None) => None,
        (input, output) => Some(TokenUsage {
            input_tokens: input.unwrap_or(0),
            output_tokens: output.unwrap_or(0),
        }),
    };

    ProviderResponse {
        content: response.message.content,
        tool_calls,
        model: response.model,
        stop_reason: response.done_reason,
        usage,
    }
}

/// Liveness plus a check that `model` has been pulled.
pub(crate) async fn model_health(
    client: &OllamaClient,
    model: &str,
) -> Result<HealthStatus, EscalateError> {
    match client.tags().await {
        Ok(tags) => {
            let pulled = tags
                .models
                .iter()
                .any(|m| m.name == model || m.name.split(':').next() == Some(model));
            if pulled {
                Ok(HealthStatus::Healthy)
            } else {
                Ok(HealthStatus::Degraded(format!(
                    "model `{model}` not pulled (try `ollama pull {model}`)"
                )))
            }
        }
        Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
    }
}

#[async_trait]
impl PluginAdapter for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        model_health(&self.client, &self.model).await
    }
}

#[async_trait]
impl ProviderAdapter for OllamaProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EscalateError> {
        let chat = self.to_chat_request(&request);
        debug!(
            model = self.model.as_str(),
            messages = chat.messages.len(),
            tools = chat.tools.len(),
            "ollama chat request"
        );
        let response = self.client.chat(&chat).await?;
        Ok(from_chat_response(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escalate_core::types::ToolDefinition;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(&OllamaConfig {
            base_url: server.uri(),
            ..OllamaConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn request_conversion_covers_system_tools_and_tool_turns() {
        let provider = OllamaProvider::new(&OllamaConfig {
            temperature: Some(0.2),
            ..OllamaConfig::default()
        })
        .unwrap();
        let call = ToolCall {
            id: "c1".into(),
            name: "get_policy_details".into(),
            arguments: json!({"policy_id": "POLICY123"}),
        };
        let request = ProviderRequest {
            system_prompt: Some("be brief".into()),
            messages: vec![
                Turn::user("details for POLICY123?"),
                Turn::assistant_with_tools("", vec![call.clone()]),
                Turn::tool_result(&call, "{\"holder\":\"John Doe\"}"),
            ],
            tools: vec![ToolDefinition {
                name: "get_policy_details".into(),
                description: "Get details".into(),
                parameters: json!({"type": "object"}),
            }],
            temperature: None,
            max_tokens: Some(256),
        };

        let chat = provider.to_chat_request(&request);
        let v = serde_json::to_value(&chat).unwrap();
        assert_eq!(v["model"], "llama3");
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["messages"][2]["role"], "assistant");
        assert_eq!(v["messages"][2]["tool_calls"][0]["function"]["name"], "get_policy_details");
        assert_eq!(v["messages"][3]["role"], "tool");
        assert_eq!(v["messages"][3]["tool_name"], "get_policy_details");
        assert_eq!(v["tools"][0]["type"], "function");
        assert_eq!(v["options"]["num_predict"], 256);
        assert!((v["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn string_arguments_are_decoded() {
        assert_eq!(
            normalize_arguments(json!("{\"query\": \"hail\"}")),
            json!({"query": "hail"})
        );
        assert_eq!(normalize_arguments(json!(null)), json!({}));
        assert_eq!(normalize_arguments(json!("not json")), json!("not json"));
    }

    #[tokio::test]
    async fn complete_returns_text_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": "llama3", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "message": {"role": "assistant", "content": "Your deductible is $500."},
                "done": true,
                "done_reason": "stop",
                "prompt_eval_count": 40,
                "eval_count": 8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server)
            .complete(ProviderRequest::prompt("deductible?"))
            .await
            .unwrap();
        assert_eq!(response.content, "Your deductible is $500.");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.stop_reason.as_deref(), Some("stop"));
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                input_tokens: 40,
                output_tokens: 8
            })
        );
    }

    #[tokio::test]
    async fn complete_surfaces_tool_calls_with_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"function": {"name": "retrieve_similar_claims", "arguments": {"query": "hail"}}},
                        {"function": {"name": "get_policy_details", "arguments": {"policy_id": "POLICY456"}}}
                    ]
                },
                "done": true
            })))
            .mount(&server)
            .await;

        let response = provider(&server)
            .complete(ProviderRequest::prompt("hail claim on POLICY456"))
            .await
            .unwrap();
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].name, "retrieve_similar_claims");
        assert_eq!(response.tool_calls[1].arguments["policy_id"], "POLICY456");
        assert_ne!(response.tool_calls[0].id, response.tool_calls[1].id);
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn health_check_reports_missing_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"models": [{"name": "mistral:latest"}]})),
            )
            .mount(&server)
            .await;

        let status = provider(&server).health_check().await.unwrap();
        assert!(matches!(status, HealthStatus::Degraded(msg) if msg.contains("llama3")));
    }

    #[tokio::test]
    async fn health_check_accepts_tagged_model() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"models": [{"name": "llama3:latest"}]})),
            )
            .mount(&server)
            .await;

        assert_eq!(
            provider(&server).health_check().await.unwrap(),
            HealthStatus::Healthy
        );
    }
}
