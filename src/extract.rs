//! Finds a tool call embedded in free-form assistant text.
//!
//! The model asks for a tool by writing a JSON object such as
//! `{"tool": "read_file", "args": {"path": "src/main.rs"}}` anywhere in its
//! reply. Prose around it may contain braces of its own, so every `{` is a
//! candidate: a single JSON value is decoded from that position (whatever
//! follows it is ignored) and the first object carrying a `tool` key wins.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::constants::{ARGS_KEY, TOOL_KEY};
use crate::think::strip_think;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    /// Name of the tool to invoke.
    pub tool: String,
    /// Named arguments; an empty object when the model sent none.
    pub args: Value,
}

impl ToolCall {
    /// Builds a call from a decoded object, or `None` when it has no `tool` key.
    fn from_object(mut object: Map<String, Value>) -> Option<Self> {
        let tool = match object.remove(TOOL_KEY)? {
            Value::String(name) => name,
            other => other.to_string(),
        };
        let args = object
            .remove(ARGS_KEY)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Some(Self { tool, args })
    }
}

/// Returns the first embedded tool call outside `<think>` blocks, if any.
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let cleaned = strip_think(text);

    for (start, _) in cleaned.match_indices('{') {
        let mut values =
            serde_json::Deserializer::from_str(&cleaned[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(object))) => {
                if let Some(call) = ToolCall::from_object(object) {
                    return Some(call);
                }
                trace!(offset = start, "JSON object without a tool key");
            }
            Some(Ok(_)) | None => {}
            Some(Err(err)) => trace!(offset = start, %err, "no JSON value at candidate"),
        }
    }

    None
}
