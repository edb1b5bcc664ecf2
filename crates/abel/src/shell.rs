// SPDX-FileCopyrightText: 2026 Abel Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `abel shell` command implementation.
//!
//! Interactive REPL with a colored prompt and readline history. Every
//! message goes through the RAG pipeline with the running conversation as
//! history.

use abel_core::{AbelError, ChatTurn};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::app::App;
use crate::commands::format_entry;

/// Turns kept as history; older ones are dropped.
const MAX_HISTORY_TURNS: usize = 20;

const MEMORIES_SHOWN: usize = 10;

#[derive(Debug, PartialEq)]
enum ShellInput<'a> {
    Empty,
    Quit,
    Reset,
    Memories,
    Help,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> ShellInput<'_> {
    let trimmed = line.trim();
    match trimmed {
        "" => ShellInput::Empty,
        "/quit" | "/exit" => ShellInput::Quit,
        "/reset" => ShellInput::Reset,
        "/memories" => ShellInput::Memories,
        "/help" => ShellInput::Help,
        cmd if cmd.starts_with('/') => ShellInput::Unknown(cmd),
        message => ShellInput::Message(message),
    }
}

/// Appends one exchange and drops the oldest turns beyond the cap.
fn push_exchange(history: &mut Vec<ChatTurn>, message: &str, response: &str) {
    history.push(ChatTurn::user(message));
    history.push(ChatTurn::assistant(response));
    if history.len() > MAX_HISTORY_TURNS {
        let excess = history.len() - MAX_HISTORY_TURNS;
        history.drain(..excess);
    }
}

fn print_help() {
    println!("  {}     show your most important memories", "/memories".yellow());
    println!("  {}        start a fresh conversation", "/reset".yellow());
    println!("  {}         leave the shell", "/quit".yellow());
}

/// Runs the `abel shell` interactive REPL.
pub async fn run_shell(app: &App, user_id: &str) -> Result<(), AbelError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| AbelError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", app.config.assistant.name).bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", user_id.green());
    let mut history: Vec<ChatTurn> = Vec::new();
    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };

        match parse_input(&line) {
            ShellInput::Empty => continue,
            ShellInput::Quit => break,
            ShellInput::Help => print_help(),
            ShellInput::Reset => {
                history.clear();
                println!("{}", "conversation reset".dimmed());
            }
            ShellInput::Memories => {
                match app.store.list_for_user(user_id, None, MEMORIES_SHOWN).await {
                    Ok(entries) if entries.is_empty() => println!("{}", "no memories yet".dimmed()),
                    Ok(entries) => entries.iter().for_each(|e| println!("{}", format_entry(e))),
                    Err(e) => eprintln!("{}: {}", "error".red(), e.user_message()),
                }
            }
            ShellInput::Unknown(cmd) => {
                eprintln!("{} {cmd}, try {}", "unknown command".red(), "/help".yellow());
            }
            ShellInput::Message(message) => {
                let _ = rl.add_history_entry(message);
                match app
                    .pipeline
                    .generate_with_context(user_id, message, Some(history.clone()))
                    .await
                {
                    Ok(response) => {
                        println!("{}\n", response.response);
                        for learning in &response.new_learnings {
                            println!("{}", format!("(noted: {})", learning.content).dimmed());
                        }
                        push_exchange(&mut history, message, &response.response);
                    }
                    Err(e) => {
                        debug!(error = %e, "shell message failed");
                        eprintln!("{}: {}", "error".red(), e.user_message());
                    }
                }
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}
