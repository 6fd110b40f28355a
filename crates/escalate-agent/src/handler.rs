// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlers: one reasoning backend behind a uniform `respond` contract.

use std::sync::Arc;

use async_trait::async_trait;
use escalate_core::types::{ProviderRequest, ToolDefinition};
use escalate_core::{
    Capability, EscalateError, HandlerDescriptor, Outcome, ProviderAdapter, Request,
    RetrievedContext,
};
use escalate_router::HandlerTable;
use tracing::{debug, warn};

use crate::retry::RetryPolicy;

/// Produces an [`Outcome`] for a request. Never fails: backend errors come
/// back as terminal failure outcomes.
#[async_trait]
pub trait Handler: Send + Sync {
    fn descriptor(&self) -> &HandlerDescriptor;

    async fn respond(&self, request: &Request, context: &RetrievedContext) -> Outcome;
}

/// A [`Handler`] over a single [`ProviderAdapter`].
pub struct BackendHandler {
    descriptor: HandlerDescriptor,
    provider: Arc<dyn ProviderAdapter>,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    retry: RetryPolicy,
    include_context: bool,
    max_tokens: Option<u32>,
}

impl BackendHandler {
    pub fn new(
        name: impl Into<String>,
        capability: Capability,
        provider: Arc<dyn ProviderAdapter>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            descriptor: HandlerDescriptor::new(name, capability),
            provider,
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            retry: RetryPolicy::default(),
            include_context: true,
            max_tokens: None,
        }
    }

    /// Tool schemas advertised to the backend on every call.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Leave the `CONTEXT:` block out of the system prompt.
    pub fn without_context(mut self) -> Self {
        self.include_context = false;
        self
    }

    fn build_request(&self, request: &Request, context: &RetrievedContext) -> ProviderRequest {
        let system_prompt = if self.include_context {
            format!("{}\n\nCONTEXT:\n{}", self.system_prompt, context.render())
        } else {
            self.system_prompt.clone()
        };
        ProviderRequest {
            system_prompt: Some(system_prompt),
            messages: request.transcript.turns().to_vec(),
            tools: self.tools.clone(),
            temperature: None,
            max_tokens: self.max_tokens,
        }
    }

    fn failure(&self, error: &EscalateError) -> Outcome {
        warn!(
            handler = self.descriptor.name.as_str(),
            backend = self.provider.name(),
            error = %error,
            "handler backend failed"
        );
        Outcome::failed(format!(
            "The {} backend could not answer: {error}",
            self.descriptor.capability
        ))
    }
}

#[async_trait]
impl Handler for BackendHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    async fn respond(&self, request: &Request, context: &RetrievedContext) -> Outcome {
        let call = self.build_request(request, context);
        debug!(
            handler = self.descriptor.name.as_str(),
            turns = call.messages.len(),
            tools = call.tools.len(),
            passages = context.passages().len(),
            "invoking backend"
        );

        let result = self
            .retry
            .retry_transient(&self.descriptor.name, || self.provider.complete(call.clone()))
            .await;

        match result {
            Ok(response) if response.tool_calls.is_empty() => {
                Outcome::answer(response.content).with_usage(response.usage)
            }
            Ok(response) => {
                Outcome::tool_request(response.content, response.tool_calls)
                    .with_usage(response.usage)
            }
            Err(e) => self.failure(&e),
        }
    }
}

/// The local and cloud handlers a pipeline routes between.
#[derive(Clone)]
pub struct HandlerSet {
    local: Arc<dyn Handler>,
    cloud: Arc<dyn Handler>,
}

impl HandlerSet {
    /// Fails when a handler is registered under the wrong capability.
    pub fn new(local: Arc<dyn Handler>, cloud: Arc<dyn Handler>) -> Result<Self, EscalateError> {
        for (handler, expected) in [
            (&local, Capability::LocalFast),
            (&cloud, Capability::CloudAccurate),
        ] {
            let actual = handler.descriptor().capability;
            if actual != expected {
                return Err(EscalateError::Config(format!(
                    "handler `{}` has capability {actual}, expected {expected}",
                    handler.descriptor().name
                )));
            }
        }
        Ok(Self { local, cloud })
    }

    /// Descriptor table for the router.
    pub fn table(&self) -> HandlerTable {
        HandlerTable {
            local: self.local.descriptor().clone(),
            cloud: self.cloud.descriptor().clone(),
        }
    }

    /// The handler registered for `descriptor`'s capability.
    pub fn resolve(&self, descriptor: &HandlerDescriptor) -> &Arc<dyn Handler> {
        match descriptor.capability {
            Capability::LocalFast => &self.local,
            Capability::CloudAccurate => &self.cloud,
        }
    }
}
