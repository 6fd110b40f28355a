// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `escalate doctor` command implementation.
//!
//! Runs diagnostic checks against the configured backends, credentials and
//! claim index so problems surface before the first query does.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use escalate_config::credentials::{GEMINI_API_KEY_ENV, TAVILY_API_KEY_ENV};
use escalate_config::model::EscalateConfig;
use escalate_config::resolve_secret;
use escalate_core::{EscalateError, HealthStatus, PluginAdapter};
use escalate_gemini::GeminiProvider;
use escalate_ollama::OllamaProvider;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `escalate doctor` command. With `plain`, disables colored output.
pub async fn run_doctor(config: &EscalateConfig, plain: bool) -> Result<(), EscalateError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        CheckResult::new("Configuration", CheckStatus::Pass, "valid", Instant::now()),
        check_database(&config.memory.database_path).await,
        check_local_backend(config).await,
        check_cloud_backend(config).await,
        check_web_search(config),
        check_memory_baseline(),
    ];

    println!();
    println!("  escalate doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", render_line(result, use_color));
    }

    println!();
    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({duration_ms}ms)", result.name, result.message)
    }
}

/// Check the claim index database exists and answers a query.
async fn check_database(db_path: &str) -> CheckResult {
    const NAME: &str = "Claim index";
    let start = Instant::now();

    if !std::path::Path::new(db_path).exists() {
        return CheckResult::new(
            NAME,
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first submit)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(NAME, CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };
    let count = conn
        .call(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get::<_, i64>(0))
        })
        .await;
    match count {
        Ok(n) => CheckResult::new(NAME, CheckStatus::Pass, format!("{n} claim(s) stored"), start),
        Err(e) => CheckResult::new(NAME, CheckStatus::Fail, format!("query failed: {e}"), start),
    }
}

async fn check_local_backend(config: &EscalateConfig) -> CheckResult {
    const NAME: &str = "Local backend";
    let start = Instant::now();
    match OllamaProvider::new(&config.ollama) {
        Ok(provider) => from_health(NAME, provider.health_check().await, start),
        Err(e) => CheckResult::new(NAME, CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_cloud_backend(config: &EscalateConfig) -> CheckResult {
    const NAME: &str = "Cloud backend";
    let start = Instant::now();
    let Some(key) = resolve_secret(config.gemini.api_key.as_deref(), GEMINI_API_KEY_ENV) else {
        return CheckResult::new(
            NAME,
            CheckStatus::Fail,
            format!("no API key (set gemini.api_key or {GEMINI_API_KEY_ENV})"),
            start,
        );
    };
    match GeminiProvider::with_api_key(key, &config.gemini) {
        Ok(provider) => from_health(NAME, provider.health_check().await, start),
        Err(e) => CheckResult::new(NAME, CheckStatus::Fail, e.to_string(), start),
    }
}

/// Only the credential is checked; a search costs quota.
fn check_web_search(config: &EscalateConfig) -> CheckResult {
    let start = Instant::now();
    match resolve_secret(config.tools.tavily_api_key.as_deref(), TAVILY_API_KEY_ENV) {
        Some(_) => CheckResult::new("Web search", CheckStatus::Pass, "API key configured", start),
        None => CheckResult::new(
            "Web search",
            CheckStatus::Warn,
            format!("no API key, `news` unavailable (set {TAVILY_API_KEY_ENV})"),
            start,
        ),
    }
}

fn from_health(
    name: &str,
    health: Result<HealthStatus, EscalateError>,
    start: Instant,
) -> CheckResult {
    match health {
        Ok(HealthStatus::Healthy) => CheckResult::new(name, CheckStatus::Pass, "reachable", start),
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new(name, CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new(name, CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
    }
}

/// Memory baseline via jemalloc.
fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}
