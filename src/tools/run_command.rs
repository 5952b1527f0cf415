//! Shell command execution with a wall-clock limit.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

use super::{parse_args, Tool, ToolResult};
use crate::constants::{COMMAND_MAX_OUTPUT_SIZE, COMMAND_TIMEOUT_SECS, ENV_API_KEY};

/// Tool that executes shell commands in a child process.
///
/// Stderr is merged into stdout in the order it was written. The child is
/// killed when its future is dropped, so interrupting the session or hitting
/// the timeout never leaves it running. The server API key is removed from
/// the child's environment.
pub struct RunCommandTool {
    root: PathBuf,
}

impl RunCommandTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RunCommandInput {
    command: String,
}

/// Truncate `output` to at most `COMMAND_MAX_OUTPUT_SIZE` bytes, appending a
/// notice when truncation occurs.
fn cap_output(output: &str) -> String {
    if output.len() <= COMMAND_MAX_OUTPUT_SIZE {
        return output.to_string();
    }
    let mut end = COMMAND_MAX_OUTPUT_SIZE;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... output truncated at {} bytes",
        &output[..end],
        COMMAND_MAX_OUTPUT_SIZE
    )
}

#[async_trait::async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the working directory and return its combined \
         stdout and stderr. The user must approve every command."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    fn sensitive(&self) -> bool {
        true
    }

    fn confirmation(&self, input: &Value) -> String {
        let command = input
            .get("command")
            .and_then(Value::as_str)
            .unwrap_or_default();
        format!("Run command '{}'?", command)
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: RunCommandInput = parse_args(input)?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(format!("{{ {}\n}} 2>&1", input.command))
            .current_dir(&self.root)
            .env_remove(ENV_API_KEY)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Failed to execute command: {}",
                    e
                )));
            }
        };

        let result = tokio::time::timeout(
            Duration::from_secs(COMMAND_TIMEOUT_SECS),
            child.wait_with_output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                // Only shell startup failures land here; the command's own
                // stderr is redirected above.
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                let text = cap_output(&text);

                if output.status.success() {
                    Ok(ToolResult::success(text))
                } else {
                    Ok(ToolResult::error(format!("Command failed: {}", text)))
                }
            }
            Ok(Err(e)) => Ok(ToolResult::error(format!(
                "Failed to execute command: {}",
                e
            ))),
            Err(_) => Ok(ToolResult::error("Command timed out.".into())),
        }
    }
}
