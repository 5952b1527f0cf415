//! Centralized constants for cunningham.
//!
//! All magic numbers, default strings, and fixed user-facing messages live
//! here so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "cunningham";

/// Default chat-completion server (an Open WebUI instance).
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Path appended to the base URL for streaming completions.
pub const COMPLETIONS_PATH: &str = "/api/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama3";

/// Maximum tokens requested per completion.
pub const MAX_TOKENS: u64 = 32_768;

/// Timeout (seconds) for connecting and for each read on the stream.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Number of characters of an error body kept in HTTP error messages.
pub const ERROR_BODY_SNIPPET_CHARS: usize = 200;

/// Upper bound on tool executions within one turn.
pub const MAX_TOOL_ROUNDS: usize = 25;

/// File read as the system prompt when present in the working directory.
pub const SYSTEM_PROMPT_FILENAME: &str = "prompt.txt";

// --- Environment ---

pub const ENV_BASE_URL: &str = "OPENWEBUI_BASE_URL";
pub const ENV_API_KEY: &str = "OPENWEBUI_API_KEY";
pub const ENV_MODEL: &str = "OPENWEBUI_MODEL";

// --- Files ---

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "cunningham.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

// --- Think tags ---

/// Prefix of an opening hidden-reasoning tag; the tag ends at the next `>`.
pub const THINK_OPEN_PREFIX: &str = "<think";

/// Closing hidden-reasoning tag.
pub const THINK_CLOSE: &str = "</think>";

/// Shown once per reply when the model starts a hidden-reasoning block.
pub const THINKING_INDICATOR: &str = "Thinking...";

// --- Tool protocol ---

/// Key that marks an embedded JSON object as a tool call.
pub const TOOL_KEY: &str = "tool";

/// Key holding the tool's named arguments.
pub const ARGS_KEY: &str = "args";

/// Assistant message recorded when the user declines a sensitive tool.
pub const CANCELLED_ACK: &str =
    "Okay, I've cancelled that command. Let me know how you'd like to proceed.";

// --- Tool limits ---

/// Wall-clock limit for `run_command`.
pub const COMMAND_TIMEOUT_SECS: u64 = 120;

/// Maximum output size (bytes) `run_command` returns before truncating.
pub const COMMAND_MAX_OUTPUT_SIZE: usize = 100 * 1024;

/// Context lines around each change in edit previews.
pub const DIFF_CONTEXT_LINES: usize = 3;

/// Maximum file size (bytes) `read_file` will number and return.
pub const READ_FILE_MAX_SIZE: u64 = 1024 * 1024;

/// Leading bytes scanned for NUL when detecting binary files.
pub const BINARY_DETECTION_BYTES: usize = 8192;
