// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-generation backend trait (Ollama, Gemini, ...).

use async_trait::async_trait;

use crate::error::EscalateError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// A text-generation backend.
///
/// Implementations make exactly one attempt per call. Retrying transient
/// failures is the caller's business; see [`EscalateError::is_transient`].
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest)
    -> Result<ProviderResponse, EscalateError>;
}
