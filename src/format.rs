use colored::Colorize;

use crate::extract::ToolCall;
use crate::message::{Message, Role};
use crate::think::strip_think;

/// Format a message for `/history` with role label and colors.
///
/// Assistant replies are shown without their hidden-reasoning spans.
pub fn format_message(msg: &Message) -> String {
    let label = format_role_label(msg);
    let body = match msg.role {
        Role::User => msg.content.clone(),
        Role::Assistant => strip_think(&msg.content).trim().to_string(),
        Role::System | Role::Tool => msg.content.dimmed().to_string(),
    };
    format!("{}\n{}", label, body)
}

fn format_role_label(msg: &Message) -> String {
    let label = match (msg.role, msg.tool_name.as_deref()) {
        (Role::Tool, Some(name)) => format!("{} ({}):", msg.role, name),
        (role, _) => format!("{}:", role),
    };
    match msg.role {
        Role::User => label.green().bold().to_string(),
        Role::Assistant => label.cyan().bold().to_string(),
        Role::System => label.dimmed().to_string(),
        Role::Tool => label.yellow().to_string(),
    }
}

/// Announce a tool call: the tool name, then its arguments as indented JSON.
pub fn format_tool_call(call: &ToolCall) -> String {
    let args = serde_json::to_string_pretty(&call.args).unwrap_or_else(|_| call.args.to_string());
    let args = args
        .lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    format!("→ Calling {} with args:\n{}", call.tool.bold(), args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_display() {
        colored::control::set_override(false);
        let call = ToolCall {
            tool: "read_file".into(),
            args: json!({"path": "src/main.rs"}),
        };
        assert_eq!(
            format_tool_call(&call),
            "→ Calling read_file with args:\n  {\n    \"path\": \"src/main.rs\"\n  }"
        );
    }

    #[test]
    fn test_history_hides_thinking() {
        colored::control::set_override(false);
        let msg = Message::assistant("<think>plan</think>Done.");
        assert_eq!(format_message(&msg), "assistant:\nDone.");
    }

    #[test]
    fn test_tool_label_names_tool() {
        colored::control::set_override(false);
        let msg = Message::tool_result("list_directory", "a.txt");
        assert_eq!(format_message(&msg), "tool (list_directory):\na.txt");
    }
}
