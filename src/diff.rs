//! Diff generation and colored rendering for line edits.
//!
//! Used by the line-editing tools to preview a change before it is written.

use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use crate::constants::DIFF_CONTEXT_LINES;

/// Generate a colored unified diff string.
///
/// Compares `old` and `new` content line-by-line and produces a unified diff
/// with colored additions (green) and deletions (red). Returns an empty string
/// if the contents are identical.
pub fn unified_diff(old: &str, new: &str, path: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut unified = diff.unified_diff();
    unified.context_radius(DIFF_CONTEXT_LINES);
    let mut hunks = unified.iter_hunks().peekable();
    if hunks.peek().is_none() {
        return String::new();
    }

    let mut output = format!("--- a/{}\n+++ b/{}\n", path, path);
    for hunk in hunks {
        output.push_str(&hunk.header().to_string());
        output.push('\n');
        for change in hunk.iter_changes() {
            let line = change.to_string_lossy();
            let line = line.trim_end_matches('\n');
            match change.tag() {
                ChangeTag::Delete => {
                    output.push_str(&format!("-{}", line).red().to_string());
                }
                ChangeTag::Insert => {
                    output.push_str(&format!("+{}", line).green().to_string());
                }
                ChangeTag::Equal => {
                    output.push_str(&format!(" {}", line));
                }
            }
            output.push('\n');
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_empty() {
        assert_eq!(unified_diff("a\nb\n", "a\nb\n", "f.txt"), "");
    }

    #[test]
    fn test_replacement_marks_both_sides() {
        colored::control::set_override(false);
        let diff = unified_diff("one\ntwo\nthree\n", "one\n2\nthree\n", "f.txt");
        assert!(diff.starts_with("--- a/f.txt\n+++ b/f.txt\n"));
        assert!(diff.contains("-two\n"));
        assert!(diff.contains("+2\n"));
        assert!(diff.contains(" one\n"));
    }

    #[test]
    fn test_insertion() {
        colored::control::set_override(false);
        let diff = unified_diff("a\nb\n", "a\n\nb\n", "f.txt");
        assert!(diff.contains("+\n"));
        assert!(!diff.contains("-a"));
    }
}
