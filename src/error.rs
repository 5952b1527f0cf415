//! Errors the conversation loop has to tell apart.
//!
//! Everything else travels as [`anyhow::Error`]; these variants are the ones
//! the REPL inspects (via `downcast_ref`) to decide whether a failure ends the
//! turn or the whole session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The endpoint answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// A frame could not be read or decoded.
    #[error("Streaming error: {0}")]
    Stream(String),

    /// The user interrupted an interactive prompt.
    #[error("interrupted")]
    Interrupted,
}

impl AgentError {
    /// Builds an [`AgentError::Api`], keeping only the first `limit` characters of the body.
    pub fn api(status: u16, body: &str, limit: usize) -> Self {
        Self::Api {
            status,
            body: body.chars().take(limit).collect(),
        }
    }

    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }
}

/// Returns true when `err` should end the session rather than the turn.
pub fn is_interrupt(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<AgentError>(), Some(AgentError::Interrupted))
}
