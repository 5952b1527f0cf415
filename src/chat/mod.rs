//! Interactive chat REPL for cunningham.
//!
//! Reads one line at a time with [`rustyline`] (history, line editing) and
//! hands each request to the [`Conversation`], which streams the reply and
//! runs any tool calls it contains.
//!
//! # Readline behavior
//!
//! - **Ctrl+C**: ends the session, at the prompt or mid-turn
//! - **Ctrl+D**: exits cleanly
//! - Readline history is persisted to `~/.cache/cunningham/chat_history.txt`

mod commands;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::agent::Conversation;
use crate::config::Config;
use crate::error::is_interrupt;
use crate::output::{Renderer, StdoutRenderer};
use crate::provider::ChatBackend;

const BANNER: &str = "Cunningham ready. Type your request. Ctrl\u{2011}D to quit.";
const PROMPT: &str = "You> ";
pub(crate) const SESSION_ENDED: &str = "Session ended.";

/// Runs the interactive chat REPL until end of input or interrupt.
pub async fn run_chat<B: ChatBackend>(mut conversation: Conversation<B>, model: &str) -> Result<()> {
    println!("{}", BANNER.green().bold());
    println!("{}", format!("[model: {}]", model).dimmed());

    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(command) = commands::SlashCommand::parse(&line) {
                    commands::handle_slash_command(command, &mut conversation);
                    continue;
                }

                if !run_turn_interruptibly(&mut conversation, &line).await {
                    println!("\n{}", SESSION_ENDED);
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("\n{}", SESSION_ENDED);
                break;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Runs one turn, racing it against Ctrl+C.
///
/// Turn errors are shown and the session goes on. Returns `false` when the
/// user interrupted and the session should end.
pub(crate) async fn run_turn_interruptibly<B: ChatBackend>(
    conversation: &mut Conversation<B>,
    input: &str,
) -> bool {
    let mut renderer = StdoutRenderer::new();
    let finished = tokio::select! {
        result = conversation.run_turn(input, &mut renderer) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match finished {
        None => false,
        Some(Ok(_)) => true,
        Some(Err(e)) if is_interrupt(&e) => false,
        Some(Err(e)) => {
            renderer.render_error(&format!("{:#}", e));
            true
        }
    }
}
