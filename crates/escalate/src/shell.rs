// SPDX-FileCopyrightText: 2026 Escalate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `escalate shell` command implementation.
//!
//! An interactive claims assistant: `submit` stores a claim in the index,
//! `ask` runs a question through the pipeline with the conversation so far,
//! `quit`/`q`/`exit` leaves. Readline history via rustyline.

use colored::Colorize;
use escalate_agent::{Conversation, Pipeline, PipelineResult};
use escalate_config::model::EscalateConfig;
use escalate_core::{EscalateError, SimilarityIndex};
use escalate_tools::builtin::submit_claim;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::bootstrap::{self, Backends, StartupError};

/// A REPL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit,
    Ask,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let cmd = line.trim().to_lowercase();
        match cmd.as_str() {
            "" => None,
            "submit" => Some(Command::Submit),
            "ask" => Some(Command::Ask),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => Some(Command::Unknown(cmd)),
        }
    }
}

/// Runs the `escalate shell` interactive REPL.
pub async fn run_shell(config: EscalateConfig) -> Result<(), StartupError> {
    let backends = Backends::connect(&config)?;
    let index = bootstrap::claim_index(&config).await?;
    let pipeline = bootstrap::claim_pipeline(&config, &backends, index.clone())?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| EscalateError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "Insurance Claim Assistant".bold().green());
    println!(
        "Commands:  {}   {}   {}\n",
        "submit".yellow(),
        "ask".yellow(),
        "quit / q / exit".yellow()
    );

    let mut conversation = Conversation::new();
    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };
        let _ = rl.add_history_entry(line.trim());

        match command {
            Command::Quit => break,
            Command::Submit => {
                let Some(text) = read_block(&mut rl, "Claim description:")? else {
                    println!("Description cannot be empty.");
                    continue;
                };
                handle_submit(index.as_ref(), &text).await;
            }
            Command::Ask => {
                let Some(question) = read_block(&mut rl, "Your question:")? else {
                    println!("Please ask something.");
                    continue;
                };
                handle_ask(&pipeline, &mut conversation, &question).await;
            }
            Command::Unknown(_) => println!("Available commands:  submit  ask  quit"),
        }
    }

    println!("{}", "Goodbye!".dimmed());
    Ok(())
}

/// Runs `escalate ask <query>`: one question, no history.
pub async fn run_ask(config: EscalateConfig, query: &str) -> Result<(), StartupError> {
    let backends = Backends::connect(&config)?;
    let index = bootstrap::claim_index(&config).await?;
    let pipeline = bootstrap::claim_pipeline(&config, &backends, index)?;
    let result = Conversation::new().ask(&pipeline, query).await;
    print_answer(&result);
    Ok(())
}

/// Prompt for one line of input. `None` when it is blank or the user
/// interrupted.
fn read_block(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>, EscalateError> {
    println!("{label}");
    match rl.readline("> ") {
        Ok(line) => {
            let text = line.trim().to_string();
            Ok((!text.is_empty()).then_some(text))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
        Err(e) => Err(EscalateError::Internal(format!("readline failed: {e}"))),
    }
}

async fn handle_submit(index: &dyn SimilarityIndex, text: &str) {
    match submit_claim(index, text).await {
        Ok(id) => println!("{} Claim registered  |  ID: {}", "✓".green(), id.as_str().bold()),
        Err(e) => eprintln!("{}: could not store claim: {e}", "error".red()),
    }
}

async fn handle_ask(pipeline: &Pipeline, conversation: &mut Conversation, question: &str) {
    println!("{}", "\nThinking...\n".dimmed());
    let result = conversation.ask(pipeline, question).await;
    print_answer(&result);
}

fn print_answer(result: &PipelineResult) {
    println!(
        "{}",
        format!(
            "[{} | {} | {} pass(es)]",
            result.decision.handler.name, result.decision.reason, result.report.invocations
        )
        .dimmed()
    );
    if result.is_failure() {
        eprintln!("{}: {}", "error".red(), result.answer());
    } else {
        println!("{}", "Answer:".bold());
        println!("{}", result.answer());
    }
    println!("{}", "─".repeat(70));
}
