//! Struct definitions and serde defaults for cunningham configuration.

use crate::permissions::PermissionConfig;
use serde::{Deserialize, Serialize};

/// Root configuration, deserialized from `config.toml`.
///
/// Fields use serde defaults so cunningham can run with sensible defaults
/// when no config file exists. Optional numeric settings fall back to the
/// values in [`crate::constants`] through the accessors in `resolve.rs`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the chat server (the completions path is appended).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token. Usually `{env:OPENWEBUI_API_KEY}` or left unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Maximum output tokens per reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    /// Connect / response / idle-read timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Upper bound on tool executions per turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tool_rounds: Option<usize>,
    /// Inline system prompt; takes precedence over `system_prompt_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// File read as the system prompt (default `prompt.txt`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<String>,
    /// Permission settings for tool execution.
    #[serde(default)]
    pub permissions: PermissionConfig,
}

pub(super) fn default_base_url() -> String {
    crate::constants::DEFAULT_BASE_URL.to_string()
}

pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            max_tokens: None,
            request_timeout_secs: None,
            max_tool_rounds: None,
            system_prompt: None,
            system_prompt_file: None,
            permissions: PermissionConfig::default(),
        }
    }
}
