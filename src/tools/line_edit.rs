//! Verified single-line edits: `insert_line` and `replace_line`.
//!
//! Both tools take a 1-based line number plus the exact current text of that
//! line, and refuse to touch the file when the two disagree.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::{parse_args, resolve_path, Tool, ToolResult};
use crate::diff::unified_diff;

/// A checked edit, ready to be written or previewed.
struct PlannedEdit {
    path: PathBuf,
    old: String,
    new: String,
}

/// `Err` holds the message reported back to the model.
type Plan = std::result::Result<PlannedEdit, String>;

/// What to do at the verified line.
enum LineChange<'a> {
    InsertBlankAfter,
    Replace(&'a str),
}

/// Validate the request and compute the new file contents.
fn plan_edit(
    root: &Path,
    path: &str,
    line_number: i64,
    expected: &str,
    change: LineChange<'_>,
) -> Result<Plan> {
    let path = resolve_path(root, path);
    if !path.is_file() {
        return Ok(Err(format!("File {} not found.", path.display())));
    }
    let old = std::fs::read_to_string(&path)?;
    let mut lines: Vec<&str> = old.lines().collect();

    if line_number < 1 || line_number as usize > lines.len() {
        return Ok(Err("Invalid line number.".into()));
    }
    let index = line_number as usize - 1;
    if lines[index] != expected {
        return Ok(Err("Match verification failed.".into()));
    }

    match change {
        LineChange::InsertBlankAfter => lines.insert(index + 1, ""),
        LineChange::Replace(replacement) => lines[index] = replacement,
    }
    let mut new = lines.join("\n");
    new.push('\n');

    Ok(Ok(PlannedEdit { path, old, new }))
}

fn apply(plan: Result<Plan>, done: String) -> Result<ToolResult> {
    match plan? {
        Ok(edit) => {
            std::fs::write(&edit.path, &edit.new)?;
            Ok(ToolResult::success(done))
        }
        Err(message) => Ok(ToolResult::error(message)),
    }
}

fn preview(plan: Result<Plan>) -> Option<String> {
    match plan {
        Ok(Ok(edit)) => {
            let diff = unified_diff(&edit.old, &edit.new, &edit.path.display().to_string());
            (!diff.is_empty()).then_some(diff)
        }
        _ => None,
    }
}

pub struct InsertLineTool {
    root: PathBuf,
}

impl InsertLineTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn plan(&self, input: &InsertLineInput) -> Result<Plan> {
        plan_edit(
            &self.root,
            &input.path,
            input.after_line,
            &input.r#match,
            LineChange::InsertBlankAfter,
        )
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InsertLineInput {
    path: String,
    after_line: i64,
    r#match: String,
}

#[async_trait::async_trait]
impl Tool for InsertLineTool {
    fn name(&self) -> &str {
        "insert_line"
    }

    fn description(&self) -> &str {
        "Insert a blank line after line `after_line`. `match` must equal the current \
         text of that line exactly."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "after_line": { "type": "integer", "description": "1-based line number" },
                "match": { "type": "string", "description": "Current text of that line" }
            },
            "required": ["path", "after_line", "match"]
        })
    }

    fn preview(&self, input: &Value) -> Option<String> {
        let input: InsertLineInput = serde_json::from_value(input.clone()).ok()?;
        preview(self.plan(&input))
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: InsertLineInput = parse_args(input)?;
        apply(
            self.plan(&input),
            format!("Inserted blank line after {}.", input.after_line),
        )
    }
}

pub struct ReplaceLineTool {
    root: PathBuf,
}

impl ReplaceLineTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn plan(&self, input: &ReplaceLineInput) -> Result<Plan> {
        plan_edit(
            &self.root,
            &input.path,
            input.line_number,
            &input.r#match,
            LineChange::Replace(&input.replacement),
        )
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplaceLineInput {
    path: String,
    line_number: i64,
    r#match: String,
    replacement: String,
}

#[async_trait::async_trait]
impl Tool for ReplaceLineTool {
    fn name(&self) -> &str {
        "replace_line"
    }

    fn description(&self) -> &str {
        "Replace line `line_number` with `replacement`. `match` must equal the current \
         text of that line exactly."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File to edit" },
                "line_number": { "type": "integer", "description": "1-based line number" },
                "match": { "type": "string", "description": "Current text of that line" },
                "replacement": { "type": "string", "description": "New text for the line" }
            },
            "required": ["path", "line_number", "match", "replacement"]
        })
    }

    fn preview(&self, input: &Value) -> Option<String> {
        let input: ReplaceLineInput = serde_json::from_value(input.clone()).ok()?;
        preview(self.plan(&input))
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let input: ReplaceLineInput = parse_args(input)?;
        apply(
            self.plan(&input),
            format!("Replaced line {}.", input.line_number),
        )
    }
}
