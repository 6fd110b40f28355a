// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalate - route each query to the cheapest backend that can answer it.
//!
//! This is the binary entry point: the claims assistant REPL, single-shot
//! questions, claim document ingestion, the news agent, batch runs and
//! environment diagnostics.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod batch;
mod bootstrap;
mod doctor;
mod ingest;
mod news;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use escalate_config::model::EscalateConfig;
use tracing_subscriber::EnvFilter;

use crate::bootstrap::StartupError;

/// Escalate - tiered LLM query router.
#[derive(Parser, Debug)]
#[command(name = "escalate", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive claims assistant (default).
    Shell,
    /// Answer a single question and exit.
    Ask {
        /// The question; words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Store claim documents in the claim index, one entry per file.
    Ingest {
        #[arg(required = true, num_args = 1.., value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Gather and summarize recent news on a subject.
    News {
        /// Subject to search for; defaults to `news.default_subject`.
        subject: Option<String>,
    },
    /// Answer every line of INPUT and write a CSV to OUTPUT.
    Batch { input: PathBuf, output: PathBuf },
    /// Check configuration, credentials, backends and the claim index.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => escalate_config::load_and_validate_path(path),
        None => escalate_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            escalate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    let outcome = match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell::run_shell(config).await,
        Commands::Ask { query } => shell::run_ask(config, &query.join(" ")).await,
        Commands::Ingest { files } => ingest::run_ingest(config, &files).await,
        Commands::News { subject } => news::run_news(config, subject).await,
        Commands::Batch { input, output } => batch::run_batch(config, &input, &output).await,
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain)
            .await
            .map_err(StartupError::from),
    };

    match outcome {
        Ok(()) => {}
        Err(StartupError::Config(errors)) => {
            escalate_config::render_errors(&errors);
            std::process::exit(1);
        }
        Err(StartupError::Runtime(e)) => {
            eprintln!("{}: {e}", "error".red());
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` wins; otherwise `agent.log_level` for escalate crates and
/// `warn` for dependencies.
fn init_tracing(config: &EscalateConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.agent.log_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

const WORKSPACE_TARGETS: &[&str] = &[
    "escalate",
    "escalate_agent",
    "escalate_config",
    "escalate_gemini",
    "escalate_memory",
    "escalate_ollama",
    "escalate_router",
    "escalate_tools",
];

fn default_directives(level: &str) -> String {
    WORKSPACE_TARGETS
        .iter()
        .fold("warn".to_string(), |acc, target| format!("{acc},{target}={level}"))
}
