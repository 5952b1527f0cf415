//! Hidden-reasoning filter for streamed replies.
//!
//! Models wrap their private reasoning in `<think>...</think>`. Tokens arrive
//! in arbitrary fragments, so a tag can be cut anywhere (`"<thi"` +
//! `"nk>"`). [`ThinkFilter`] is a small state machine fed one fragment at a
//! time: it returns the visible text as soon as it is known to be visible,
//! holds back a trailing partial tag until the next fragment decides it, and
//! collects the contents of every completed hidden block.
//!
//! Tags are matched strictly left to right, first match, non-overlapping.
//! There is no nesting: a second `<think>` inside a hidden block is just
//! hidden text, and the first `</think>` closes the block.

use crate::constants::{THINK_CLOSE, THINK_OPEN_PREFIX};

/// One piece of filter output, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text to show the user.
    Text(String),
    /// The reply entered its first hidden block; emitted at most once per reply.
    Thinking,
}

/// Incremental `<think>` stripper. Create one per assistant reply.
#[derive(Debug, Default)]
pub struct ThinkFilter {
    in_think: bool,
    think_shown: bool,
    /// Unconsumed tail that may be the start of a tag.
    pending: String,
    /// Every fragment fed so far, unmodified.
    raw: String,
    /// Contents of the block currently open.
    current_hidden: String,
    /// Contents of each closed block, in order.
    hidden: Vec<String>,
}

impl ThinkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while an opening tag has been consumed and its closing tag has not.
    pub fn is_inside_hidden(&self) -> bool {
        self.in_think
    }

    /// Consumes one fragment and returns what became visible.
    pub fn feed(&mut self, fragment: &str) -> Vec<Segment> {
        self.raw.push_str(fragment);

        let mut buf = std::mem::take(&mut self.pending);
        buf.push_str(fragment);

        let mut out = Vec::new();
        let mut cursor = 0;

        while cursor < buf.len() {
            let rest = &buf[cursor..];

            if self.in_think {
                match rest.find(THINK_CLOSE) {
                    Some(end) => {
                        self.current_hidden.push_str(&rest[..end]);
                        self.hidden.push(std::mem::take(&mut self.current_hidden));
                        self.in_think = false;
                        cursor += end + THINK_CLOSE.len();
                    }
                    None => {
                        let keep = partial_suffix_len(rest, THINK_CLOSE);
                        let split = rest.len() - keep;
                        self.current_hidden.push_str(&rest[..split]);
                        self.pending = rest[split..].to_string();
                        break;
                    }
                }
                continue;
            }

            if rest.starts_with(THINK_OPEN_PREFIX) {
                match rest.find('>') {
                    Some(gt) => {
                        self.in_think = true;
                        if !self.think_shown {
                            self.think_shown = true;
                            out.push(Segment::Thinking);
                        }
                        cursor += gt + 1;
                    }
                    None => {
                        // Opening tag still missing its `>`.
                        self.pending = rest.to_string();
                        break;
                    }
                }
                continue;
            }

            if rest.starts_with('<') {
                if THINK_OPEN_PREFIX.starts_with(rest) {
                    self.pending = rest.to_string();
                    break;
                }
                push_text(&mut out, "<");
                cursor += 1;
                continue;
            }

            match rest.find('<') {
                Some(lt) => {
                    push_text(&mut out, &rest[..lt]);
                    cursor += lt;
                }
                None => {
                    push_text(&mut out, rest);
                    cursor = buf.len();
                }
            }
        }

        out
    }

    /// Flushes held-back text once the reply has ended.
    ///
    /// A partial `<think` prefix turns out to be ordinary text. An opening tag
    /// that never got its `>`, or a block that never closed, stays hidden.
    pub fn finish(&mut self) -> Vec<Segment> {
        let pending = std::mem::take(&mut self.pending);
        let mut out = Vec::new();
        if self.in_think {
            self.current_hidden.push_str(&pending);
        } else if !pending.starts_with(THINK_OPEN_PREFIX) {
            push_text(&mut out, &pending);
        }
        out
    }

    /// The unfiltered reply so far.
    #[cfg(test)]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    pub fn into_raw(self) -> String {
        self.raw
    }

    /// Contents of every closed hidden block, in order.
    pub fn hidden_segments(&self) -> &[String] {
        &self.hidden
    }

    /// Contents of the last closed hidden block, if any.
    pub fn last_hidden(&self) -> Option<&str> {
        self.hidden.last().map(String::as_str)
    }
}

/// Removes every `<think>...</think>` span from a complete text.
///
/// Uses the same tag rules as [`ThinkFilter`], so an unclosed block hides the
/// rest of the text.
pub fn strip_think(text: &str) -> String {
    let mut filter = ThinkFilter::new();
    let mut segments = filter.feed(text);
    segments.extend(filter.finish());
    visible_text(&segments)
}

/// Concatenates the text segments, dropping indicators.
pub fn visible_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::Text(t) => Some(t.as_str()),
            Segment::Thinking => None,
        })
        .collect()
}

fn push_text(out: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Segment::Text(text.to_string()));
    }
}

/// Length of the longest proper prefix of `tag` that `s` ends with.
fn partial_suffix_len(s: &str, tag: &str) -> usize {
    (1..tag.len())
        .rev()
        .find(|&k| s.ends_with(&tag[..k]))
        .unwrap_or(0)
}
