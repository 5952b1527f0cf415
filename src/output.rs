//! Output rendering abstraction for cunningham.
//!
//! Defines the [`Renderer`] trait that decouples the conversation loop from
//! the terminal. [`StdoutRenderer`] prints as fragments arrive; tests record
//! the calls instead.

use colored::Colorize;
use std::io::{self, Write};

use crate::constants::THINKING_INDICATOR;
use crate::extract::ToolCall;
use crate::format::format_tool_call;
use crate::tools::ToolResult;

/// Everything the conversation loop shows the user.
pub trait Renderer {
    /// A streamed reply is about to start.
    fn begin_reply(&mut self);

    /// Visible reply text, as soon as it is known to be visible.
    fn render_text(&mut self, text: &str);

    /// The reply entered hidden reasoning (at most once per reply).
    fn render_thinking(&mut self);

    /// The streamed reply ended, successfully or not.
    fn end_reply(&mut self);

    fn render_tool_call(&mut self, call: &ToolCall);

    /// Preview of a tool's effect, shown before confirmation.
    fn render_preview(&mut self, preview: &str);

    fn render_tool_result(&mut self, result: &ToolResult);

    /// Informational message (cancellations, limits).
    fn render_notice(&mut self, text: &str);

    fn render_error(&mut self, err: &str);
}

/// Renders directly to stdout.
///
/// Each fragment is printed immediately with an explicit flush so the user
/// sees a "typing" effect.
#[derive(Default)]
pub struct StdoutRenderer;

impl StdoutRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn flush() {
    io::stdout().flush().ok();
}

impl Renderer for StdoutRenderer {
    fn begin_reply(&mut self) {
        print!("{}", "Assistant: ".bold());
        flush();
    }

    fn render_text(&mut self, text: &str) {
        print!("{}", text);
        // Flush immediately so each fragment appears as it arrives
        flush();
    }

    fn render_thinking(&mut self) {
        print!("{}", THINKING_INDICATOR.dimmed());
        flush();
    }

    fn end_reply(&mut self) {
        println!();
    }

    fn render_tool_call(&mut self, call: &ToolCall) {
        println!("{}", format_tool_call(call).cyan());
    }

    fn render_preview(&mut self, preview: &str) {
        print!("{}", preview);
        flush();
    }

    fn render_tool_result(&mut self, result: &ToolResult) {
        println!("{}", "Tool result:".magenta());
        if result.is_error {
            println!("{}", result.content.red());
        } else {
            println!("{}", result.content);
        }
    }

    fn render_notice(&mut self, text: &str) {
        println!("{}", text.yellow());
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}
