//! Entry point for cunningham, a terminal agent for Open WebUI models.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! sets up logging and dispatches to the chosen subcommand.

mod agent;
mod chat;
mod cli;
mod config;
mod constants;
mod diff;
mod error;
mod extract;
mod format;
mod logging;
mod message;
mod output;
mod permissions;
mod provider;
mod think;
mod tools;

use anyhow::Result;

/// Runs the cunningham CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`]. An interrupt ends the session quietly.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    logging::init(cli.debug);

    match cli::run(cli).await {
        Err(e) if error::is_interrupt(&e) => {
            println!("\n{}", chat::SESSION_ENDED);
            Ok(())
        }
        other => other,
    }
}
