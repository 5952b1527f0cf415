//! The conversation loop.
//!
//! [`Conversation`] owns the message history and drives one turn at a time:
//! stream a reply through the [`ThinkFilter`] for live display, look for an
//! embedded tool call in the finished reply, run it (after a permission check
//! and, for sensitive tools, confirmation), feed the result back and stream
//! again. The turn ends when a reply carries no tool call, the user declines a
//! call, or the per-turn tool budget runs out.

use anyhow::Result;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::constants::CANCELLED_ACK;
use crate::extract::{extract_tool_call, ToolCall};
use crate::message::{Message, Role};
use crate::output::Renderer;
use crate::permissions::{Confirm, Permission, PermissionManager, PromptResponse};
use crate::provider::ChatBackend;
use crate::think::{Segment, ThinkFilter};
use crate::tools::{ToolRegistry, ToolResult};

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The last reply contained no tool call.
    Completed,
    /// The user declined a tool call.
    Cancelled,
    /// The per-turn tool budget was used up.
    RoundLimit,
}

pub struct Conversation<B: ChatBackend> {
    backend: B,
    tools: ToolRegistry,
    permissions: PermissionManager,
    confirmer: Box<dyn Confirm>,
    messages: Vec<Message>,
    last_think: Option<String>,
    max_tool_rounds: usize,
}

impl<B: ChatBackend> Conversation<B> {
    /// Starts a conversation whose first message is `system_prompt`.
    pub fn new(
        backend: B,
        tools: ToolRegistry,
        permissions: PermissionManager,
        confirmer: Box<dyn Confirm>,
        system_prompt: String,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            backend,
            tools,
            permissions,
            confirmer,
            messages: vec![Message::system(system_prompt)],
            last_think: None,
            max_tool_rounds,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Contents of the most recent closed `<think>` block.
    pub fn last_think(&self) -> Option<&str> {
        self.last_think.as_deref()
    }

    /// Forget everything but the system prompt.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
        self.last_think = None;
    }

    /// Runs one user turn to completion.
    ///
    /// A failure of the first request removes the user message again, so the
    /// turn can simply be retried. A failure later in the chain leaves the
    /// completed steps in the history and drops only the broken reply.
    ///
    /// The tool chain continues while each new reply carries another call,
    /// up to `max_tool_rounds` calls per turn. Reaching that cap stops the
    /// chain with [`TurnOutcome::RoundLimit`] so a model that keeps calling
    /// tools cannot loop forever; raise `max_tool_rounds` in the config to
    /// allow longer chains.
    pub async fn run_turn(
        &mut self,
        input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome> {
        let checkpoint = self.messages.len();
        self.messages.push(Message::user(input));

        let mut reply = match self.stream_reply(renderer).await {
            Ok(reply) => reply,
            Err(err) => {
                self.messages.truncate(checkpoint);
                return Err(err);
            }
        };
        self.messages.push(Message::assistant(reply.as_str()));

        let mut rounds = 0;
        while let Some(call) = extract_tool_call(&reply) {
            if rounds >= self.max_tool_rounds {
                warn!(rounds, "tool budget exhausted");
                renderer.render_notice(&format!(
                    "Stopped after {} tool calls in one turn.",
                    rounds
                ));
                return Ok(TurnOutcome::RoundLimit);
            }
            rounds += 1;

            renderer.render_tool_call(&call);
            let Some(result) = self.execute(&call, renderer).await? else {
                renderer.render_notice("Command cancelled by user; no further tools executed.");
                self.messages.push(Message::assistant(CANCELLED_ACK));
                return Ok(TurnOutcome::Cancelled);
            };
            renderer.render_tool_result(&result);
            self.messages
                .push(Message::tool_result(call.tool.as_str(), result.content));

            reply = self.stream_reply(renderer).await?;
            self.messages.push(Message::assistant(reply.as_str()));
        }

        Ok(TurnOutcome::Completed)
    }

    /// Streams one reply for the current history, rendering the visible
    /// part as it arrives. Returns the raw reply.
    async fn stream_reply(&mut self, renderer: &mut dyn Renderer) -> Result<String> {
        let mut filter = ThinkFilter::new();
        renderer.begin_reply();
        let streamed = self.pump(&mut filter, renderer).await;
        if streamed.is_ok() {
            render_segments(filter.finish(), renderer);
        }
        renderer.end_reply();
        streamed?;

        if filter.is_inside_hidden() {
            warn!("reply ended inside an unclosed <think> block");
        }
        debug!(
            bytes = filter.raw_len(),
            hidden_blocks = filter.hidden_segments().len(),
            "reply complete"
        );
        if let Some(thought) = filter.last_hidden() {
            self.last_think = Some(thought.to_string());
        }
        Ok(filter.into_raw())
    }

    async fn pump(&self, filter: &mut ThinkFilter, renderer: &mut dyn Renderer) -> Result<()> {
        let mut stream = self.backend.stream_chat(&self.messages).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            render_segments(filter.feed(&chunk.content), renderer);
        }
        Ok(())
    }

    /// Checks permissions and runs the call.
    ///
    /// Returns `None` when the user declined.
    async fn execute(
        &mut self,
        call: &ToolCall,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<ToolResult>> {
        if let Some(tool) = self.tools.get(&call.tool).cloned() {
            let permission = self.permissions.check(tool.name(), tool.sensitive());
            if permission == Permission::Deny {
                debug!(tool = %call.tool, "tool denied by configuration");
                return Ok(Some(ToolResult::error(format!(
                    "Tool '{}' is disabled by user configuration.",
                    call.tool
                ))));
            }

            if let Some(preview) = tool.preview(&call.args) {
                renderer.render_preview(&preview);
            }

            if permission == Permission::Ask {
                match self.confirmer.confirm(&tool.confirmation(&call.args))? {
                    PromptResponse::Yes => {}
                    PromptResponse::Always => {
                        self.permissions
                            .set_session_override(tool.name(), Permission::Allow);
                    }
                    PromptResponse::No => {
                        debug!(tool = %call.tool, "tool call declined");
                        return Ok(None);
                    }
                }
            }
        }

        Ok(Some(self.tools.execute(&call.tool, call.args.clone()).await))
    }
}

fn render_segments(segments: Vec<Segment>, renderer: &mut dyn Renderer) {
    for segment in segments {
        match segment {
            Segment::Text(text) => renderer.render_text(&text),
            Segment::Thinking => renderer.render_thinking(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::permissions::{AutoConfirm, PermissionConfig};
    use crate::provider::{ChunkStream, StreamChunk};
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    enum Reply {
        Chunks(Vec<&'static str>),
        BreaksAfter(Vec<&'static str>),
        Status(u16),
    }

    #[derive(Default)]
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            }
        }

        fn requests(&self) -> Vec<Vec<Message>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn stream_chat(&self, messages: &[Message]) -> Result<ChunkStream> {
            self.requests.lock().unwrap().push(messages.to_vec());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("backend called more often than scripted");
            let items: Vec<Result<StreamChunk>> = match reply {
                Reply::Chunks(chunks) => chunks.into_iter().map(|c| Ok(StreamChunk::new(c))).collect(),
                Reply::BreaksAfter(chunks) => chunks
                    .into_iter()
                    .map(|c| Ok(StreamChunk::new(c)))
                    .chain(std::iter::once(Err(anyhow::Error::from(AgentError::stream(
                        "connection reset",
                    )))))
                    .collect(),
                Reply::Status(status) => return Err(AgentError::api(status, "upstream down", 200).into()),
            };
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        visible: String,
        thinking: usize,
        replies: usize,
        calls: Vec<ToolCall>,
        previews: Vec<String>,
        results: Vec<ToolResult>,
        notices: Vec<String>,
    }

    impl Renderer for RecordingRenderer {
        fn begin_reply(&mut self) {
            self.replies += 1;
        }
        fn render_text(&mut self, text: &str) {
            self.visible.push_str(text);
        }
        fn render_thinking(&mut self) {
            self.thinking += 1;
        }
        fn end_reply(&mut self) {}
        fn render_tool_call(&mut self, call: &ToolCall) {
            self.calls.push(call.clone());
        }
        fn render_preview(&mut self, preview: &str) {
            self.previews.push(preview.to_string());
        }
        fn render_tool_result(&mut self, result: &ToolResult) {
            self.results.push(result.clone());
        }
        fn render_notice(&mut self, text: &str) {
            self.notices.push(text.to_string());
        }
        fn render_error(&mut self, _err: &str) {}
    }

    /// Answers every question the same way and remembers what was asked.
    struct RecordingConfirm {
        answer: PromptResponse,
        questions: Arc<Mutex<Vec<String>>>,
    }

    impl Confirm for RecordingConfirm {
        fn confirm(&self, question: &str) -> Result<PromptResponse> {
            self.questions.lock().unwrap().push(question.to_string());
            Ok(self.answer)
        }
    }

    fn conversation(
        replies: Vec<Reply>,
        root: &Path,
        confirmer: Box<dyn Confirm>,
    ) -> Conversation<ScriptedBackend> {
        Conversation::new(
            ScriptedBackend::new(replies),
            ToolRegistry::with_builtins(root.to_path_buf()),
            PermissionManager::new(PermissionConfig::default()),
            confirmer,
            "system prompt".into(),
            crate::constants::MAX_TOOL_ROUNDS,
        )
    }

    fn roles(messages: &[Message]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn test_plain_reply_hides_thinking() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![Reply::Chunks(vec!["Hello <think>pondering", "</think>world"])],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        let outcome = conv.run_turn("hi", &mut out).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(out.visible, "Hello world");
        assert_eq!(out.thinking, 1);
        assert_eq!(conv.last_think(), Some("pondering"));
        assert_eq!(
            roles(conv.messages()),
            [Role::System, Role::User, Role::Assistant]
        );
        assert_eq!(
            conv.messages()[2].content,
            "Hello <think>pondering</think>world"
        );
    }

    #[tokio::test]
    async fn test_split_tags_across_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![Reply::Chunks(vec!["<thi", "nk>secret</thi", "nk>visible text"])],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        conv.run_turn("go", &mut out).await.unwrap();

        assert_eq!(out.visible, "visible text");
        assert_eq!(conv.last_think(), Some("secret"));
    }

    #[tokio::test]
    async fn test_tool_chain_feeds_result_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec![
                    "Sure. <think>plan: ls then read</think>",
                    "{\"tool\": \"list_directory\", \"args\": {}}",
                ]),
                Reply::Chunks(vec!["There is one file."]),
            ],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        let outcome = conv.run_turn("what's here?", &mut out).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(out.replies, 2);
        assert!(out.visible.starts_with("Sure. "));
        assert_eq!(conv.last_think(), Some("plan: ls then read"));
        assert_eq!(
            out.calls,
            [ToolCall {
                tool: "list_directory".into(),
                args: serde_json::json!({}),
            }]
        );

        let messages = conv.messages();
        assert_eq!(
            roles(messages),
            [
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Tool,
                Role::Assistant
            ]
        );
        assert_eq!(messages[3].tool_name.as_deref(), Some("list_directory"));
        assert_eq!(messages[3].content, "a.txt");
        assert_eq!(messages[4].content, "There is one file.");

        let requests = conv.backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 4);
        assert_eq!(requests[1][3].role, Role::Tool);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec!["{\"tool\": \"delete_universe\"}"]),
                Reply::Chunks(vec!["I cannot do that."]),
            ],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        let outcome = conv.run_turn("destroy", &mut out).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(conv.messages()[3].content, "Unknown tool delete_universe.");
        assert_eq!(conv.backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_argument_error_is_reported_to_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec!["{\"tool\": \"read_file\", \"args\": {\"file\": \"x\"}}"]),
                Reply::Chunks(vec!["Oops."]),
            ],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        conv.run_turn("read x", &mut out).await.unwrap();

        assert!(conv.messages()[3].content.starts_with("Argument error: "));
    }

    #[tokio::test]
    async fn test_declined_command_ends_turn() {
        let dir = tempfile::tempdir().unwrap();
        let questions = Arc::new(Mutex::new(Vec::new()));
        let mut conv = conversation(
            vec![Reply::Chunks(vec![
                "{\"tool\": \"run_command\", \"args\": {\"command\": \"touch marker\"}}",
            ])],
            dir.path(),
            Box::new(RecordingConfirm {
                answer: PromptResponse::No,
                questions: questions.clone(),
            }),
        );
        let mut out = RecordingRenderer::default();

        let outcome = conv.run_turn("make a marker", &mut out).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(*questions.lock().unwrap(), ["Run command 'touch marker'?"]);
        assert!(!dir.path().join("marker").exists());
        assert_eq!(conv.backend.requests().len(), 1);
        assert_eq!(
            out.notices,
            ["Command cancelled by user; no further tools executed."]
        );
        assert!(out.results.is_empty());

        let last = conv.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, CANCELLED_ACK);
    }

    #[tokio::test]
    async fn test_approved_command_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec!["{\"tool\": \"run_command\", \"args\": {\"command\": \"echo hi\"}}"]),
                Reply::Chunks(vec!["It printed hi."]),
            ],
            dir.path(),
            Box::new(AutoConfirm::approve()),
        );
        let mut out = RecordingRenderer::default();

        conv.run_turn("say hi", &mut out).await.unwrap();

        assert_eq!(conv.messages()[3].content, "hi\n");
        assert_eq!(conv.messages()[3].tool_name.as_deref(), Some("run_command"));
    }

    #[tokio::test]
    async fn test_always_skips_later_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let questions = Arc::new(Mutex::new(Vec::new()));
        let call = "{\"tool\": \"run_command\", \"args\": {\"command\": \"true\"}}";
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec![call]),
                Reply::Chunks(vec![call]),
                Reply::Chunks(vec!["done"]),
            ],
            dir.path(),
            Box::new(RecordingConfirm {
                answer: PromptResponse::Always,
                questions: questions.clone(),
            }),
        );
        let mut out = RecordingRenderer::default();

        conv.run_turn("twice", &mut out).await.unwrap();

        assert_eq!(questions.lock().unwrap().len(), 1);
        assert_eq!(out.results.len(), 2);
    }

    #[tokio::test]
    async fn test_denied_tool_never_asks() {
        let dir = tempfile::tempdir().unwrap();
        let questions = Arc::new(Mutex::new(Vec::new()));
        let mut permissions = PermissionConfig::default();
        permissions
            .tools
            .insert("run_command".into(), Permission::Deny);
        let mut conv = Conversation::new(
            ScriptedBackend::new(vec![
                Reply::Chunks(vec!["{\"tool\": \"run_command\", \"args\": {\"command\": \"ls\"}}"]),
                Reply::Chunks(vec!["Fine."]),
            ]),
            ToolRegistry::with_builtins(dir.path().to_path_buf()),
            PermissionManager::new(permissions),
            Box::new(RecordingConfirm {
                answer: PromptResponse::Yes,
                questions: questions.clone(),
            }),
            "sys".into(),
            5,
        );
        let mut out = RecordingRenderer::default();

        conv.run_turn("list", &mut out).await.unwrap();

        assert!(questions.lock().unwrap().is_empty());
        assert_eq!(
            conv.messages()[3].content,
            "Tool 'run_command' is disabled by user configuration."
        );
    }

    #[tokio::test]
    async fn test_edit_preview_shown_before_running() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "old\n").unwrap();
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec![
                    "{\"tool\": \"replace_line\", \"args\": {\"path\": \"f.txt\", \
                     \"line_number\": 1, \"match\": \"old\", \"replacement\": \"new\"}}",
                ]),
                Reply::Chunks(vec!["Updated."]),
            ],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        conv.run_turn("edit", &mut out).await.unwrap();

        assert_eq!(out.previews.len(), 1);
        assert_eq!(conv.messages()[3].content, "Replaced line 1.");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f.txt")).unwrap(),
            "new\n"
        );
    }

    #[tokio::test]
    async fn test_failed_first_request_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![Reply::Status(502), Reply::Chunks(vec!["Back again."])],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        let err = conv.run_turn("hello", &mut out).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502: upstream down");
        assert_eq!(roles(conv.messages()), [Role::System]);

        conv.run_turn("hello", &mut out).await.unwrap();
        assert_eq!(
            roles(conv.messages()),
            [Role::System, Role::User, Role::Assistant]
        );
    }

    #[tokio::test]
    async fn test_broken_follow_up_keeps_completed_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![
                Reply::Chunks(vec!["{\"tool\": \"list_directory\"}"]),
                Reply::BreaksAfter(vec!["The directory"]),
            ],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();

        let err = conv.run_turn("ls", &mut out).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AgentError>(),
            Some(AgentError::Stream(_))
        ));
        assert_eq!(
            roles(conv.messages()),
            [Role::System, Role::User, Role::Assistant, Role::Tool]
        );
    }

    #[tokio::test]
    async fn test_round_limit_stops_chain() {
        let dir = tempfile::tempdir().unwrap();
        let call = "{\"tool\": \"list_directory\"}";
        let mut conv = Conversation::new(
            ScriptedBackend::new(vec![
                Reply::Chunks(vec![call]),
                Reply::Chunks(vec![call]),
                Reply::Chunks(vec![call]),
            ]),
            ToolRegistry::with_builtins(dir.path().to_path_buf()),
            PermissionManager::new(PermissionConfig::default()),
            Box::new(AutoConfirm::decline()),
            "sys".into(),
            2,
        );
        let mut out = RecordingRenderer::default();

        let outcome = conv.run_turn("loop", &mut out).await.unwrap();

        assert_eq!(outcome, TurnOutcome::RoundLimit);
        assert_eq!(out.results.len(), 2);
        assert_eq!(conv.backend.requests().len(), 3);
        assert_eq!(out.notices, ["Stopped after 2 tool calls in one turn."]);
    }

    #[tokio::test]
    async fn test_clear_keeps_system_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut conv = conversation(
            vec![Reply::Chunks(vec!["<think>t</think>ok"])],
            dir.path(),
            Box::new(AutoConfirm::decline()),
        );
        let mut out = RecordingRenderer::default();
        conv.run_turn("hi", &mut out).await.unwrap();

        conv.clear();

        assert_eq!(roles(conv.messages()), [Role::System]);
        assert_eq!(conv.messages()[0].content, "system prompt");
        assert_eq!(conv.last_think(), None);
    }
}
