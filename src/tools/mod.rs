pub mod line_edit;
pub mod list_directory;
pub mod read_file;
pub mod run_command;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use line_edit::{InsertLineTool, ReplaceLineTool};
use list_directory::ListDirectoryTool;
use read_file::ReadFileTool;
use run_command::RunCommandTool;

/// The result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: String) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(content: String) -> Self {
        Self {
            content,
            is_error: true,
        }
    }
}

/// Arguments did not match the shape a tool expects.
#[derive(Debug, thiserror::Error)]
#[error("Argument error: {0}")]
pub struct ArgumentError(String);

/// Deserialize a tool's named arguments, rejecting anything that is not a
/// JSON object.
pub fn parse_args<T: DeserializeOwned>(input: Value) -> Result<T> {
    if !input.is_object() {
        return Err(ArgumentError(format!("expected named arguments, got {}", input)).into());
    }
    serde_json::from_value(input).map_err(|e| ArgumentError(e.to_string()).into())
}

/// Expand a leading `~` and resolve `path` against `root`.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let expanded = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    };
    let joined = root.join(expanded);
    joined.canonicalize().unwrap_or(joined)
}

/// Every tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the system prompt.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn schema(&self) -> Value;

    /// Whether the tool needs confirmation unless configured otherwise.
    fn sensitive(&self) -> bool {
        false
    }

    /// Question put to the user before a confirmed call.
    fn confirmation(&self, _input: &Value) -> String {
        format!("Allow tool '{}'?", self.name())
    }

    /// Optional preview of the effect of a call, shown before it runs.
    fn preview(&self, _input: &Value) -> Option<String> {
        None
    }

    /// Execute the tool with the given JSON input.
    async fn execute(&self, input: Value) -> Result<ToolResult>;
}

/// Holds all registered tools and dispatches calls by name.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Called during startup.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(Arc::from(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Look up a tool by name and execute it.
    ///
    /// Never fails: unknown tools, bad arguments and tool faults all come
    /// back as an error result whose text is meant for the model.
    pub async fn execute(&self, name: &str, input: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::error(format!("Unknown tool {}.", name));
        };
        debug!(tool = name, "executing tool");
        match tool.execute(input).await {
            Ok(result) => result,
            Err(err) => match err.downcast_ref::<ArgumentError>() {
                Some(arg_err) => ToolResult::error(arg_err.to_string()),
                None => ToolResult::error(format!("Tool {} failed: {:#}", name, err)),
            },
        }
    }

    /// System prompt describing the tools and how to call them.
    ///
    /// Used when no prompt is configured.
    pub fn protocol_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are a helpful assistant working in the user's terminal.\n\
             You can use tools. To call one, reply with a single JSON object of the form\n\
             {\"tool\": \"<name>\", \"args\": {<named arguments>}}\n\
             and nothing after it. The tool result comes back in the next message.\n\
             Call at most one tool per reply. When no tool is needed, answer normally.\n\n\
             Available tools:\n",
        );
        for tool in &self.tools {
            prompt.push_str(&format!(
                "- {}: {}\n  arguments: {}\n",
                tool.name(),
                tool.description(),
                tool.schema()
            ));
        }
        prompt
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a registry with all built-in tools.
    pub fn with_builtins(root: PathBuf) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListDirectoryTool::new(root.clone())));
        registry.register(Box::new(ReadFileTool::new(root.clone())));
        registry.register(Box::new(InsertLineTool::new(root.clone())));
        registry.register(Box::new(ReplaceLineTool::new(root.clone())));
        registry.register(Box::new(RunCommandTool::new(root)));
        registry
    }
}
