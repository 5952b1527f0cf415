//! Server-sent event decoding for streamed chat completions.
//!
//! The response body looks like:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Framing is line-oriented: every `data:` line is one payload, whether the
//! server separates frames with a blank line or a single newline. Lines are
//! reassembled across network reads, and a final line without a trailing
//! newline still counts. Lines without the `data:` prefix (`event:`, `id:`,
//! comments, blank separators) are ignored.
//!
//! `[DONE]` ends the stream normally. A payload that is not valid JSON ends it
//! with an error, since a corrupt frame means the rest of the stream cannot be
//! trusted.

use std::fmt::Display;

use anyhow::Result;
use futures::future;
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::{ChunkStream, StreamChunk};
use crate::error::AgentError;

/// Payload of the end-of-stream sentinel line.
const DONE_SENTINEL: &str = "[DONE]";

/// Field name that marks a payload-carrying line.
const DATA_FIELD: &str = "data:";

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<ChoiceContent>,
    #[serde(default)]
    message: Option<ChoiceContent>,
}

#[derive(Debug, Deserialize)]
struct ChoiceContent {
    #[serde(default)]
    content: Option<String>,
}

/// Decodes one data payload.
///
/// Returns `Ok(None)` for well-formed frames that carry no text (role-only
/// deltas, usage frames, empty choices). The first choice's `delta.content`
/// is preferred; `message.content` covers servers that send whole messages.
pub fn parse_payload(data: &str) -> Result<Option<StreamChunk>> {
    let chunk: CompletionChunk = serde_json::from_str(data)
        .map_err(|e| AgentError::stream(format!("Malformed frame ({e}): {data}")))?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(AgentError::stream(format!("Server reported an error: {message}")).into());
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let content = [choice.delta, choice.message]
        .into_iter()
        .flatten()
        .filter_map(|c| c.content)
        .find(|c| !c.is_empty());

    Ok(content.map(StreamChunk::new))
}

/// Splits a byte stream into lines, without their `\n` / `\r\n` endings.
///
/// Bytes are buffered until a newline arrives, so a multi-byte character cut
/// by a network read is decoded whole. Whatever remains when the body ends is
/// yielded as a last line.
fn lines<S, B, E>(body: S) -> impl Stream<Item = std::result::Result<String, String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let body = Box::pin(body);
    stream::unfold(Some((body, Vec::new())), |state| async move {
        let Some((mut body, mut buf)) = state else {
            return None;
        };
        loop {
            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let rest = buf.split_off(pos + 1);
                let line = std::mem::replace(&mut buf, rest);
                return Some((Ok(decode_line(&line)), Some((body, buf))));
            }
            match body.next().await {
                Some(Ok(bytes)) => buf.extend_from_slice(bytes.as_ref()),
                Some(Err(err)) => return Some((Err(err.to_string()), None)),
                None if buf.is_empty() => return None,
                None => return Some((Ok(decode_line(&buf)), None)),
            }
        }
    })
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// Payload of a `data:` line, with the single optional space after the colon
/// removed. `None` for any other line.
fn data_payload(line: &str) -> Option<&str> {
    let payload = line.strip_prefix(DATA_FIELD)?;
    Some(payload.strip_prefix(' ').unwrap_or(payload))
}

/// Turns a raw response body into a stream of content fragments.
///
/// The stream ends at `[DONE]`, at the end of the body, or right after the
/// first error it yields.
pub fn decode_sse<S, B, E>(body: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let frames = lines(body).scan(false, |failed, line| {
        if *failed {
            return future::ready(None);
        }
        let next = match line {
            Ok(line) => match data_payload(&line) {
                None => Some(None),
                Some(DONE_SENTINEL) => None,
                Some("") => Some(None),
                Some(data) => {
                    trace!(data, "SSE frame");
                    match parse_payload(data) {
                        Ok(chunk) => Some(chunk.map(Ok)),
                        Err(err) => {
                            *failed = true;
                            Some(Some(Err(err)))
                        }
                    }
                }
            },
            Err(err) => {
                *failed = true;
                Some(Some(Err(AgentError::stream(err).into())))
            }
        };
        future::ready(next)
    });

    Box::pin(frames.filter_map(future::ready))
}
