// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini backend for Escalate.
//!
//! Implements [`ProviderAdapter`] over the `models/{model}:generateContent`
//! endpoint, including function calling. This is the "cloud-accurate" tier.
//! API key resolution order: `gemini.api_key` -> `GOOGLE_API_KEY` -> error.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use escalate_config::credentials::GEMINI_API_KEY_ENV;
use escalate_config::model::GeminiConfig;
use escalate_config::require_secret;
use escalate_core::error::EscalateError;
use escalate_core::traits::{PluginAdapter, ProviderAdapter};
use escalate_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, Role, TokenUsage, ToolCall,
    Turn,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info};

use crate::types::{
    ApiErrorResponse, Content, FunctionCall, FunctionDeclaration, FunctionResponse,
    GenerateRequest, GenerateResponse, GenerationConfig, Part, Tools,
};

const BACKEND: &str = "gemini";

/// Gemini provider implementing [`ProviderAdapter`].
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl GeminiProvider {
    /// Creates a provider, resolving the API key from config or environment.
    pub fn new(config: &GeminiConfig) -> Result<Self, EscalateError> {
        let api_key = require_secret(config.api_key.as_deref(), "gemini.api_key", GEMINI_API_KEY_ENV)
            .map_err(|e| EscalateError::Config(e.to_string()))?;
        Self::with_api_key(api_key, config)
    }

    /// Creates a provider with an already-resolved API key.
    pub fn with_api_key(api_key: String, config: &GeminiConfig) -> Result<Self, EscalateError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| EscalateError::Config(format!("invalid API key header value: {e}")))?,
        );
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| EscalateError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(model = config.model.as_str(), "Gemini provider initialized");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_generate_request(&self, request: &ProviderRequest) -> GenerateRequest {
        let mut system_texts: Vec<String> = request.system_prompt.iter().cloned().collect();
        let mut contents: Vec<Content> = Vec::new();

        for turn in &request.messages {
            if turn.role == Role::System {
                system_texts.push(turn.content.clone());
                continue;
            }
            let (role, parts) = to_parts(turn);
            match contents.last_mut() {
                Some(last) if last.role.as_deref() == Some(role) => last.parts.extend(parts),
                _ => contents.push(Content {
                    role: Some(role.to_string()),
                    parts,
                }),
            }
        }

        let system_instruction = (!system_texts.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::text(system_texts.join("\n\n"))],
        });

        let tools = if request.tools.is_empty() {
            vec![]
        } else {
            vec![Tools {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        let temperature = request.temperature.or(self.temperature);
        let generation_config =
            (temperature.is_some() || request.max_tokens.is_some()).then(|| GenerationConfig {
                temperature,
                max_output_tokens: request.max_tokens,
            });

        GenerateRequest {
            contents,
            system_instruction,
            tools,
            generation_config,
        }
    }

    async fn send(&self, body: &GenerateRequest) -> Result<GenerateResponse, EscalateError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        debug!(status = %status, "gemini response received");
        let text = response.text().await.map_err(|e| self.send_error(e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorResponse>(&text)
                .map(|e| format!("{} {}", e.error.status, e.error.message))
                .unwrap_or(text);
            return Err(EscalateError::from_http_status(
                BACKEND,
                status.as_u16(),
                &detail,
            ));
        }

        serde_json::from_str(&text).map_err(|e| EscalateError::MalformedResponse {
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
                message: format!("request failed: {e}"),
                source: Some(Box::new(e)),
            }
        }
    }
}

/// Gemini role and parts for one turn. Tool results travel as
/// `functionResponse` parts on the user side.
fn to_parts(turn: &Turn) -> (&'static str, Vec<Part>) {
    match turn.role {
        Role::Assistant => {
            let mut parts = Vec::new();
            if !turn.content.is_empty() {
                parts.push(Part::text(turn.content.clone()));
            }
            parts.extend(turn.tool_calls.iter().map(|c| Part {
                function_call: Some(FunctionCall {
                    name: c.name.clone(),
                    args: c.arguments.clone(),
                }),
                ..Part::default()
            }));
            if parts.is_empty() {
                parts.push(Part::text(""));
            }
            ("model", parts)
        }
        Role::Tool => {
            let part = Part {
                function_response: Some(FunctionResponse {
                    name: turn.tool_name.clone().unwrap_or_default(),
                    response: serde_json::json!({ "content": turn.content }),
                }),
                ..Part::default()
            };
            ("user", vec![part])
        }
        Role::User | Role::System => ("user", vec![Part::text(turn.content.clone())]),
    }
}

fn from_generate_response(response: GenerateResponse) -> Result<ProviderResponse, EscalateError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {r}"));
        return Err(match reason {
            Some(message) => EscalateError::provider(message),
            None => EscalateError::MalformedResponse {
                backend: BACKEND.to_string(),
                message: "response contained no candidates".to_string(),
            },
        });
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.parts {
        if let Some(text) = part.text {
            content.push_str(&text);
        }
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: call.name,
                arguments: call.args,
            });
        }
    }

    Ok(ProviderResponse {
        content,
        tool_calls,
        model: response.model_version.unwrap_or_default(),
        stop_reason: candidate.finish_reason,
        usage: response.usage_metadata.map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        }),
    })
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    /// Fetches the model resource; costs no tokens.
    async fn health_check(&self) -> Result<HealthStatus, EscalateError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) => Ok(HealthStatus::Unhealthy(format!(
                "model lookup returned {}",
                r.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EscalateError> {
        let body = self.to_generate_request(&request);
        debug!(
            model = self.model.as_str(),
            contents = body.contents.len(),
            "gemini generateContent request"
        );
        let response = self.send(&body).await?;
        let mut converted = from_generate_response(response)?;
        if converted.model.is_empty() {
            converted.model = self.model.clone();
        }
        Ok(converted)
    }
}
