//! HTTP client for an OpenAI-style streaming chat-completion endpoint.
//!
//! Contains the [`Provider`] struct, which owns a reqwest client plus the
//! endpoint, credential and model it talks to. One POST is made per reply;
//! the body is decoded lazily by [`decode_sse`](super::decode_sse).

use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::header::ACCEPT;
use tracing::debug;

use super::{decode_sse, ChatBackend, ChatRequest, ChunkStream};
use crate::config::Config;
use crate::constants::{COMPLETIONS_PATH, ERROR_BODY_SNIPPET_CHARS};
use crate::error::AgentError;
use crate::message::Message;

/// A configured chat-completion endpoint ready to stream replies.
pub struct Provider {
    http: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u64,
    /// Longest wait for the response head or for the next body read.
    timeout: Duration,
}

impl Provider {
    /// Creates a [`Provider`] from the resolved config and API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config, api_key: String) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs());
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                COMPLETIONS_PATH
            ),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens(),
            timeout,
        })
    }

    #[cfg(test)]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl ChatBackend for Provider {
    async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream> {
        let request = ChatRequest {
            model: &self.model,
            stream: true,
            max_tokens: self.max_tokens,
            messages,
        };
        debug!(url = %self.url, model = %self.model, messages = messages.len(), "opening completion stream");

        let send = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "text/event-stream")
            .json(&request)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| {
                AgentError::stream(format!(
                    "no response from {} after {}s",
                    self.url,
                    self.timeout.as_secs()
                ))
            })?
            .with_context(|| format!("Failed to reach {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("(failed to read response body: {e})"));
            return Err(AgentError::api(status.as_u16(), &body, ERROR_BODY_SNIPPET_CHARS).into());
        }

        Ok(with_idle_timeout(
            decode_sse(response.bytes_stream()),
            self.timeout,
        ))
    }
}

/// Ends the stream with an error when no fragment arrives within `idle`.
fn with_idle_timeout(stream: ChunkStream, idle: Duration) -> ChunkStream {
    let guarded = futures::stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => Some((
                Err(AgentError::stream(format!(
                    "no data received for {}s",
                    idle.as_secs()
                ))
                .into()),
                None,
            )),
        }
    });
    Box::pin(guarded)
}
