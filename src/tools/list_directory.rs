use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::{parse_args, resolve_path, Tool, ToolResult};

/// Lists a directory, one entry per line, directories suffixed with `/`.
pub struct ListDirectoryTool {
    root: PathBuf,
}

impl ListDirectoryTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListDirectoryInput {
    #[serde(default)]
    path: Option<String>,
}

#[async_trait::async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the contents of a directory (the working directory when no path is given). \
         Directories end with '/'."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list"
                }
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: ListDirectoryInput = parse_args(input)?;
        let path = resolve_path(&self.root, input.path.as_deref().unwrap_or("."));

        if !path.exists() {
            return Ok(ToolResult::error(format!(
                "Path {} does not exist.",
                path.display()
            )));
        }
        if path.is_file() {
            return Ok(ToolResult::error(format!("{} is a file.", path.display())));
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        if entries.is_empty() {
            return Ok(ToolResult::success("(empty)".into()));
        }
        Ok(ToolResult::success(entries.join("\n")))
    }
}
