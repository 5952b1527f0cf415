//! Chat-completion transport.
//!
//! The conversation loop only sees [`ChatBackend`]: hand it the full message
//! history, get back a lazy stream of content fragments. [`Provider`] is the
//! real implementation (reqwest + SSE); tests script their own backends.

mod client;
mod sse;

use std::pin::Pin;

use anyhow::Result;
use futures::Stream;
use serde::Serialize;

use crate::message::Message;

pub use client::Provider;
pub use sse::decode_sse;

/// One incremental piece of assistant output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    pub content: String,
}

impl StreamChunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// A finite stream of fragments; an `Err` item ends the reply.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Body of a streaming chat-completion request.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub stream: bool,
    pub max_tokens: u64,
    pub messages: &'a [Message],
}

/// Anything that can turn a conversation into a streamed reply.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens one streamed reply for `messages`.
    ///
    /// Fails before yielding anything when the request cannot be made or the
    /// server answers with a non-success status.
    async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let request = ChatRequest {
            model: "m",
            stream: true,
            max_tokens: 32_768,
            messages: &messages,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "m",
                "stream": true,
                "max_tokens": 32768,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }
}
