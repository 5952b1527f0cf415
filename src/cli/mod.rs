//! Command-line interface definition and dispatch for cunningham.
//!
//! Uses [`clap`] for argument parsing with derive macros. Without a
//! subcommand cunningham starts the interactive chat.

use crate::agent::Conversation;
use crate::error::AgentError;
use crate::output::StdoutRenderer;
use crate::permissions::{AutoConfirm, Confirm, PermissionManager, TerminalConfirm};
use crate::provider::Provider;
use crate::tools::ToolRegistry;
use crate::{chat, config};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Top-level CLI structure for cunningham.
#[derive(Parser)]
#[command(
    name = "cunningham",
    version,
    about = "A terminal agent for Open WebUI models with embedded tool calls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use (overrides config and OPENWEBUI_MODEL)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Server base URL (overrides config and OPENWEBUI_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Run tools that need confirmation without asking
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Show debug logs on stderr
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available subcommands for the cunningham CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session (the default)
    Chat,
    /// Run a single request and exit
    Ask {
        /// The request
        prompt: Vec<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the resolved config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = config::Config::load()?;
    config.apply_overrides(cli.model, cli.base_url);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let model = config.model.clone();
            let conversation = build_conversation(&config, cli.yes)?;
            chat::run_chat(conversation, &model).await
        }
        Commands::Ask { prompt } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: cunningham ask \"your request here\"");
            }
            let mut conversation = build_conversation(&config, cli.yes)?;
            println!("{} {}", "You>".green().bold(), prompt);

            let mut renderer = StdoutRenderer::new();
            tokio::select! {
                result = conversation.run_turn(&prompt, &mut renderer) => result.map(|_| ()),
                _ = tokio::signal::ctrl_c() => Err(AgentError::Interrupted.into()),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let path = config::Config::config_path()?;
                println!("{} {}", "Config path:".bold(), path.display());
                println!();
                let mut shown = config;
                if shown.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                    shown.api_key = Some("********".into());
                }
                println!("{}", toml::to_string_pretty(&shown)?);
                Ok(())
            }
        },
    }
}

/// Wires config, credentials, tools and permissions into a conversation.
fn build_conversation(config: &config::Config, auto_approve: bool) -> Result<Conversation<Provider>> {
    let api_key = match config.resolve_api_key() {
        Some(key) => key,
        None => obtain_api_key()?,
    };
    let provider = Provider::from_config(config, api_key)?;

    let root = std::env::current_dir()?;
    let tools = ToolRegistry::with_builtins(root.clone());
    let system_prompt = config
        .load_system_prompt(&root)?
        .unwrap_or_else(|| tools.protocol_prompt());

    let confirmer: Box<dyn Confirm> = if auto_approve {
        Box::new(AutoConfirm::approve())
    } else {
        Box::new(TerminalConfirm)
    };

    Ok(Conversation::new(
        provider,
        tools,
        PermissionManager::new(config.permissions.clone()),
        confirmer,
        system_prompt,
        config.max_tool_rounds(),
    ))
}

/// Asks for the API key when neither the environment nor the config has one.
fn obtain_api_key() -> Result<String> {
    let mut rl = DefaultEditor::new()?;
    let prompt = format!("Enter your {}: ", crate::constants::ENV_API_KEY);
    let key = match rl.readline(&prompt) {
        Ok(line) => line.trim().to_string(),
        Err(ReadlineError::Interrupted) => return Err(AgentError::Interrupted.into()),
        Err(ReadlineError::Eof) => String::new(),
        Err(e) => return Err(e.into()),
    };
    if key.is_empty() {
        anyhow::bail!("No API key supplied, exiting.");
    }
    Ok(key)
}
