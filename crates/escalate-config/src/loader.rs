// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./escalate.toml` > `~/.config/escalate/escalate.toml` >
//! `/etc/escalate/escalate.toml` with environment variable overrides via `ESCALATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::EscalateConfig;

/// Top-level sections; each maps `ESCALATE_<SECTION>_<KEY>` to `<section>.<key>`.
const SECTIONS: &[&str] = &[
    "agent",
    "routing",
    "reflection",
    "retry",
    "ollama",
    "gemini",
    "memory",
    "tools",
    "news",
    "batch",
];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/escalate/escalate.toml";
pub(crate) const LOCAL_CONFIG_FILE: &str = "escalate.toml";

/// Path of the per-user config file, if the platform has a config directory.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("escalate").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/escalate/escalate.toml` (system-wide)
/// 3. `~/.config/escalate/escalate.toml` (user XDG config)
/// 4. `./escalate.toml` (local directory)
/// 5. `ESCALATE_*` environment variables
pub fn load_config() -> Result<EscalateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<EscalateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EscalateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EscalateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EscalateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(EscalateConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `ESCALATE_ROUTING_FORCE_HANDLER` must become
/// `routing.force_handler`, not `routing.force.handler`.
fn env_provider() -> Env {
    Env::prefixed("ESCALATE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("routing_force_handler"), "routing.force_handler");
        assert_eq!(map_env_key("gemini_api_key"), "gemini.api_key");
        assert_eq!(map_env_key("agent_max_tool_rounds"), "agent.max_tool_rounds");
        assert_eq!(map_env_key("tools_tavily_api_key"), "tools.tavily_api_key");
        assert_eq!(map_env_key("retry_max_attempts"), "retry.max_attempts");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(map_env_key("unrelated"), "unrelated");
        // A section name must be followed by an underscore to count.
        assert_eq!(map_env_key("agentx"), "agentx");
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escalate.toml");
        std::fs::write(&path, "[batch]\nmax_workers = 9\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.batch.max_workers, 9);
    }
}
