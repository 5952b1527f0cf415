//! Permission configuration and runtime checking for tool execution.
//!
//! Provides [`PermissionManager`] which loads permission rules from config
//! and decides whether each tool call should be allowed, require user
//! confirmation, or be denied entirely. Confirmation itself goes through the
//! [`Confirm`] trait so the conversation loop can run against a terminal
//! prompt or a fixed policy.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::AgentError;

/// Permission level for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Allow,
    Ask,
    Deny,
}

/// Configuration for the permission system.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PermissionConfig {
    /// Per-tool permissions: tool_name -> Permission
    #[serde(default)]
    pub tools: HashMap<String, Permission>,
}

/// Manages runtime permission checks.
pub struct PermissionManager {
    config: PermissionConfig,
    /// Session-level overrides (user chose "always" during this session).
    session_overrides: HashMap<String, Permission>,
}

impl PermissionManager {
    pub fn new(config: PermissionConfig) -> Self {
        Self {
            config,
            session_overrides: HashMap::new(),
        }
    }

    /// Check permission for a tool call.
    ///
    /// Session overrides win, then the configured level. Tools without a
    /// configured level are asked about when `sensitive`, allowed otherwise.
    pub fn check(&self, tool_name: &str, sensitive: bool) -> Permission {
        if let Some(perm) = self.session_overrides.get(tool_name) {
            return *perm;
        }
        match self.config.tools.get(tool_name) {
            Some(perm) => *perm,
            None if sensitive => Permission::Ask,
            None => Permission::Allow,
        }
    }

    /// Set a session-level override (used when user chooses "always").
    pub fn set_session_override(&mut self, tool_name: &str, perm: Permission) {
        self.session_overrides.insert(tool_name.to_string(), perm);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    Yes,
    No,
    Always,
}

impl PromptResponse {
    fn parse(answer: &str) -> Self {
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Self::Yes,
            "a" | "always" => Self::Always,
            _ => Self::No,
        }
    }
}

/// Asks the user whether a tool call may proceed.
pub trait Confirm {
    fn confirm(&self, question: &str) -> Result<PromptResponse>;
}

/// Interactive yes/no prompt on the terminal. Anything but an explicit yes
/// counts as no.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> Result<PromptResponse> {
        let mut rl = DefaultEditor::new()?;
        match rl.readline(&format!("{} [y/N/a(lways)] ", question)) {
            Ok(answer) => Ok(PromptResponse::parse(&answer)),
            Err(ReadlineError::Interrupted) => Err(AgentError::Interrupted.into()),
            Err(ReadlineError::Eof) => Ok(PromptResponse::No),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fixed answer without prompting, for `--yes` and for tests.
pub struct AutoConfirm(pub PromptResponse);

impl AutoConfirm {
    pub fn approve() -> Self {
        Self(PromptResponse::Yes)
    }

    #[cfg(test)]
    pub fn decline() -> Self {
        Self(PromptResponse::No)
    }
}

impl Confirm for AutoConfirm {
    fn confirm(&self, _question: &str) -> Result<PromptResponse> {
        Ok(self.0)
    }
}
