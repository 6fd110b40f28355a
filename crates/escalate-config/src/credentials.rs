// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lookup with environment variable fallback.

use crate::diagnostic::ConfigError;

/// Environment variable consulted when `gemini.api_key` is unset.
pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable consulted when `tools.tavily_api_key` is unset.
pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";

/// Returns the configured value, else the environment variable, ignoring blanks.
pub fn resolve_secret(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|v| !v.trim().is_empty())
}

/// Like [`resolve_secret`], but a missing value is a configuration error.
pub fn require_secret(
    configured: Option<&str>,
    key: &str,
    env_var: &str,
) -> Result<String, ConfigError> {
    resolve_secret(configured, env_var).ok_or_else(|| ConfigError::MissingCredential {
        key: key.to_string(),
        env_var: env_var.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET: &str = "ESCALATE_TEST_CREDENTIAL_NEVER_SET";

    #[test]
    fn configured_value_wins() {
        assert_eq!(
            resolve_secret(Some("from-config"), UNSET).as_deref(),
            Some("from-config")
        );
    }

    #[test]
    fn blank_value_counts_as_missing() {
        assert_eq!(resolve_secret(Some("   "), UNSET), None);
    }

    #[test]
    fn missing_credential_names_key_and_env_var() {
        let err = require_secret(None, "gemini.api_key", UNSET).unwrap_err();
        match err {
            ConfigError::MissingCredential { key, env_var } => {
                assert_eq!(key, "gemini.api_key");
                assert_eq!(env_var, UNSET);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
