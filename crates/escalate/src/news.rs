// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `escalate news` command implementation.

use colored::Colorize;
use escalate_config::model::EscalateConfig;

use crate::bootstrap::{self, Backends, StartupError};

/// Subject to search: the argument when given and non-blank, else the
/// configured default.
pub fn resolve_subject(arg: Option<&str>, config: &EscalateConfig) -> String {
    arg.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(config.news.default_subject.as_str())
        .to_string()
}

pub async fn run_news(config: EscalateConfig, subject: Option<String>) -> Result<(), StartupError> {
    let subject = resolve_subject(subject.as_deref(), &config);
    let backends = Backends::connect(&config)?;
    let agent = bootstrap::news_agent(&config, &backends)?;

    println!(
        "{} {}",
        "Gathering latest news on:".bold().cyan(),
        subject.yellow()
    );
    let digest = agent.gather(&subject).await;

    println!();
    if digest.is_failure() || digest.summary().trim().is_empty() {
        eprintln!("{}", "No detailed summary was generated.".red().bold());
        if digest.is_failure() {
            eprintln!("{}", digest.summary().dimmed());
        }
        return Ok(());
    }

    println!("{}", "NEWS DIGEST".bold().green());
    println!("{}", "─".repeat(70).green());
    println!("{}", digest.summary());
    println!("{}", "─".repeat(70).green());
    println!(
        "{}",
        format!(
            "{} pass(es), {} search round(s)",
            digest.report.invocations, digest.report.tool_rounds
        )
        .dimmed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_subject_when_missing_or_blank() {
        let config = EscalateConfig::default();
        assert_eq!(resolve_subject(None, &config), "AI agents developments");
        assert_eq!(resolve_subject(Some("   "), &config), "AI agents developments");
        assert_eq!(resolve_subject(Some(" Rust 2024 "), &config), "Rust 2024");
    }
}
