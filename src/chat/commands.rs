//! Slash command handlers for the chat REPL.
//!
//! Recognizes `/think`, `/history`, `/clear` and `/help`. Anything else,
//! including input that merely starts with `/` such as a file path, is a
//! request for the model.

use colored::Colorize;

use crate::agent::Conversation;
use crate::format;
use crate::message::Role;
use crate::provider::ChatBackend;

/// A meta-command handled locally instead of being sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlashCommand {
    Think,
    History,
    Clear,
    Help,
}

impl SlashCommand {
    /// Recognizes a whole input line as a meta-command.
    pub(crate) fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "/think" => Some(Self::Think),
            "/history" => Some(Self::History),
            "/clear" => Some(Self::Clear),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Run a recognized meta-command against the conversation.
pub(crate) fn handle_slash_command<B: ChatBackend>(
    command: SlashCommand,
    conversation: &mut Conversation<B>,
) {
    match command {
        SlashCommand::Think => match conversation.last_think() {
            Some(thought) => println!("{}", thought.dimmed()),
            None => println!("No thoughts from last response."),
        },
        SlashCommand::History => {
            for msg in conversation.messages() {
                if msg.role == Role::System {
                    continue;
                }
                println!("{}", format::format_message(msg));
                println!();
            }
        }
        SlashCommand::Clear => {
            conversation.clear();
            println!("{}", "History cleared.".dimmed());
        }
        SlashCommand::Help => {
            println!("{}", "Commands:".bold());
            println!(
                "  {} - show the hidden reasoning of the last reply",
                "/think".cyan()
            );
            println!("  {} - show conversation history", "/history".cyan());
            println!("  {} - clear conversation", "/clear".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - exit", "Ctrl+D".cyan());
        }
    }
}
