// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Escalate query router.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Escalate adapters and pipeline stages.
#[derive(Debug, Error)]
pub enum EscalateError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Similarity index or database errors.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Backend rejected the request (bad request, auth failure, unknown model).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend could not be reached or reported itself overloaded.
    #[error("backend `{backend}` unavailable: {message}")]
    BackendUnavailable {
        backend: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backend answered with a body that could not be decoded.
    #[error("malformed response from `{backend}`: {message}")]
    MalformedResponse { backend: String, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// A tool invocation failed.
    #[error("tool `{name}` failed: {message}")]
    Tool { name: String, message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EscalateError {
    /// Whether a retry of the same call can reasonably succeed.
    ///
    /// Timeouts, unreachable or overloaded backends, and undecodable replies
    /// are transient. Everything else is returned to the caller as-is.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EscalateError::BackendUnavailable { .. }
                | EscalateError::MalformedResponse { .. }
                | EscalateError::Timeout { .. }
        )
    }

    /// Shorthand for an unavailable-backend error without an underlying source.
    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        EscalateError::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        EscalateError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Classify a non-success HTTP status from `backend`.
    ///
    /// 408, 429 and 5xx mean the backend is overloaded or down and map to
    /// [`EscalateError::BackendUnavailable`]; any other status is a rejected
    /// request.
    pub fn from_http_status(backend: &str, status: u16, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", body.trim());
        match status {
            408 | 429 | 500..=599 => EscalateError::unavailable(backend, message),
            _ => EscalateError::provider(format!("{backend} rejected request: {message}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(EscalateError::unavailable("ollama", "connection refused").is_transient());
        assert!(
            EscalateError::MalformedResponse {
                backend: "gemini".into(),
                message: "expected value".into(),
            }
            .is_transient()
        );
        assert!(
            EscalateError::Timeout {
                duration: Duration::from_secs(5)
            }
            .is_transient()
        );

        assert!(!EscalateError::provider("invalid api key").is_transient());
        assert!(!EscalateError::Config("missing".into()).is_transient());
        assert!(
            !EscalateError::Tool {
                name: "web_search".into(),
                message: "boom".into(),
            }
            .is_transient()
        );
        assert!(!EscalateError::Internal("bug".into()).is_transient());
    }

    #[test]
    fn http_status_classification() {
        assert!(EscalateError::from_http_status("ollama", 503, "busy").is_transient());
        assert!(EscalateError::from_http_status("gemini", 429, "quota").is_transient());
        assert!(EscalateError::from_http_status("gemini", 408, "").is_transient());

        let rejected = EscalateError::from_http_status("gemini", 400, "bad model ");
        assert!(!rejected.is_transient());
        assert_eq!(
            rejected.to_string(),
            "provider error: gemini rejected request: HTTP 400: bad model"
        );
    }

    #[test]
    fn display_includes_backend_name() {
        let err = EscalateError::unavailable("ollama", "connection refused");
        assert_eq!(
            err.to_string(),
            "backend `ollama` unavailable: connection refused"
        );
    }
}
