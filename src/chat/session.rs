//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! store and drives turns through the streaming adapter.

use std::path::Path;

use crate::Error;
use crate::adapter::{StreamingAdapter, TurnOutcome};
use crate::attachment::{IngestReport, ingest_files};
use crate::chat::config::ChatConfig;
use crate::conversation::Conversation;
use crate::error::Result;
use crate::provider::ModelProvider;
use crate::render::Renderer;
use crate::types::{Model, UsageMetadata};

/// What happened to a submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Nothing was sent: a turn is already in flight or there was nothing to send.
    Ignored,
    /// The reply streamed to completion.
    Completed(TurnOutcome),
    /// The turn failed; the reply message records the error.
    Failed(Error),
}

/// A chat session that manages conversation state and API interactions.
///
/// The session maintains message history and handles streaming responses
/// from the provider.
pub struct ChatSession<P: ModelProvider> {
    adapter: StreamingAdapter<P>,
    conversation: Conversation,
    use_color: bool,
    usage_totals: UsageMetadata,
    last_turn_usage: Option<UsageMetadata>,
    request_count: u64,
    failed_count: u64,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of messages in the conversation.
    pub message_count: usize,
    /// The number of attachments waiting for the next message.
    pub pending_attachments: usize,
    /// The system instruction, if any.
    pub system_instruction: Option<String>,
    /// The sampling temperature.
    pub temperature: f32,
    /// The top-p value.
    pub top_p: f32,
    /// The top-k value.
    pub top_k: u32,
    /// Total prompt tokens across all requests.
    pub total_prompt_tokens: u64,
    /// Total generated tokens across all requests.
    pub total_candidates_tokens: u64,
    /// Total billed tokens across all requests.
    pub total_tokens: u64,
    /// Total number of API requests made.
    pub total_requests: u64,
    /// Number of requests that failed.
    pub failed_requests: u64,
    /// Usage for the last turn, if the provider reported it.
    pub last_turn_usage: Option<UsageMetadata>,
}

impl<P: ModelProvider> ChatSession<P> {
    /// Creates a new chat session with the given provider and configuration.
    pub fn new(provider: P, config: &ChatConfig) -> Self {
        Self::with_adapter(StreamingAdapter::new(provider), config)
    }

    /// Creates a new chat session around a configured adapter.
    pub fn with_adapter(adapter: StreamingAdapter<P>, config: &ChatConfig) -> Self {
        Self {
            adapter,
            conversation: Conversation::with_settings(
                config.model.clone(),
                config.generation_config(),
            ),
            use_color: config.use_color,
            usage_totals: UsageMetadata::default(),
            last_turn_usage: None,
            request_count: 0,
            failed_count: 0,
        }
    }

    /// The conversation store.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The conversation store, for mutation.
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Whether output should use ANSI colors.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Sends `text` together with any queued attachments.
    pub async fn send(&mut self, text: &str, renderer: &mut dyn Renderer) -> SubmitOutcome {
        self.conversation.set_input(text);
        self.submit(renderer).await
    }

    /// Submits the pending input and attachments as a new turn.
    ///
    /// Appends the user message and an empty reply, streams the reply into
    /// the store while handing each update to `renderer`, and records a
    /// failure on the reply message.  Provider errors never escape.
    pub async fn submit(&mut self, renderer: &mut dyn Renderer) -> SubmitOutcome {
        if self.conversation.is_loading() || !self.conversation.has_pending() {
            return SubmitOutcome::Ignored;
        }

        let history = self.conversation.messages().to_vec();
        let (text, attachments) = self.conversation.take_pending();
        let user = match self.conversation.append_user_message(text, attachments) {
            Ok(user) => user,
            Err(err) => {
                renderer.print_error(&err.to_string());
                return SubmitOutcome::Ignored;
            }
        };
        let reply_id = self.conversation.append_placeholder_reply().id;
        self.conversation.set_loading(true);
        self.request_count += 1;

        let model = self.conversation.model().clone();
        let config = self.conversation.config().clone();
        renderer.start_reply();

        let conversation = &mut self.conversation;
        let result = self
            .adapter
            .send_turn_detailed(
                &model,
                &history,
                &user.text,
                &user.attachments,
                &config,
                |cumulative| {
                    conversation.update_message_text(&reply_id, cumulative);
                    if let Some(reply) = conversation.get(&reply_id) {
                        renderer.update_reply(reply);
                    }
                },
            )
            .await;

        let outcome = match result {
            Ok(turn) => {
                self.conversation.update_message_text(&reply_id, &turn.text);
                self.conversation.complete_message(&reply_id);
                self.record_usage(turn.usage);
                SubmitOutcome::Completed(turn)
            }
            Err(err) => {
                self.conversation
                    .mark_error(&reply_id, format!("Error: {err}"));
                self.failed_count += 1;
                SubmitOutcome::Failed(err)
            }
        };
        self.conversation.set_loading(false);

        if let Some(reply) = self.conversation.get(&reply_id) {
            renderer.finish_reply(reply);
        }
        outcome
    }

    /// Reads files and queues the readable ones for the next message.
    pub fn attach<I, Q>(&mut self, paths: I) -> IngestReport
    where
        I: IntoIterator<Item = Q>,
        Q: AsRef<Path>,
    {
        let report = ingest_files(paths);
        self.conversation
            .add_attachments(report.attachments.iter().cloned());
        report
    }

    /// Drops a queued attachment by its 1-based position.
    pub fn detach(&mut self, number: usize) -> Result<()> {
        number
            .checked_sub(1)
            .and_then(|index| self.conversation.remove_attachment(index))
            .map(|_| ())
            .ok_or_else(|| {
                Error::validation(
                    format!("there is no attachment number {number}"),
                    Some("attachment".to_string()),
                )
            })
    }

    /// Clears the conversation history and anything being composed.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Changes the model for subsequent messages.
    pub fn set_model(&mut self, model: Model) {
        self.conversation.set_model(model);
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        self.conversation.model()
    }

    /// Sets or clears the system instruction.
    pub fn set_system_instruction(&mut self, instruction: Option<String>) {
        self.conversation.config_mut().system_instruction = instruction;
    }

    /// Returns the current system instruction, if any.
    pub fn system_instruction(&self) -> Option<&str> {
        self.conversation.config().system_instruction.as_deref()
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        self.update_config(|config| config.temperature = temperature)
    }

    /// Sets the top-p value.
    pub fn set_top_p(&mut self, top_p: f32) -> Result<()> {
        self.update_config(|config| config.top_p = top_p)
    }

    /// Sets the top-k value.
    pub fn set_top_k(&mut self, top_k: u32) {
        self.conversation.config_mut().top_k = top_k;
    }

    fn update_config(
        &mut self,
        update: impl FnOnce(&mut crate::conversation::GenerationConfig),
    ) -> Result<()> {
        let mut config = self.conversation.config().clone();
        update(&mut config);
        config.validate()?;
        *self.conversation.config_mut() = config;
        Ok(())
    }

    /// Returns stats about the current session.
    pub fn stats(&self) -> SessionStats {
        let config = self.conversation.config();
        SessionStats {
            model: self.conversation.model().clone(),
            message_count: self.conversation.len(),
            pending_attachments: self.conversation.attachments().len(),
            system_instruction: config.system_instruction.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            total_prompt_tokens: self.usage_totals.prompt_token_count,
            total_candidates_tokens: self.usage_totals.candidates_token_count,
            total_tokens: self.usage_totals.total_token_count,
            total_requests: self.request_count,
            failed_requests: self.failed_count,
            last_turn_usage: self.last_turn_usage,
        }
    }

    fn record_usage(&mut self, usage: Option<UsageMetadata>) {
        self.last_turn_usage = usage;
        if let Some(usage) = usage {
            self.usage_totals = self.usage_totals + usage;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Message, MessageState};
    use crate::provider::testing::ScriptedProvider;
    use crate::types::{GenerateContentResponse, KnownModel, Part, Role};
    use crate::Attachment;

    #[derive(Default)]
    struct RecordingRenderer {
        updates: Vec<String>,
        finished: Vec<Message>,
        errors: Vec<String>,
    }

    impl Renderer for RecordingRenderer {
        fn start_reply(&mut self) {}

        fn update_reply(&mut self, message: &Message) {
            self.updates.push(message.text.clone());
        }

        fn finish_reply(&mut self, message: &Message) {
            self.finished.push(message.clone());
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_info(&mut self, _info: &str) {}

        fn print_attachments(&mut self, _attachments: &[Attachment]) {}
    }

    fn session(provider: ScriptedProvider) -> ChatSession<ScriptedProvider> {
        ChatSession::new(provider, &ChatConfig::new())
    }

    #[test]
    fn new_session_empty() {
        let session = session(ScriptedProvider::texts(&[]));
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.model(), &Model::Known(KnownModel::Gemini3FlashPreview));
        assert!(session.use_color());
    }

    #[tokio::test]
    async fn hello_streams_into_placeholder() {
        let mut session = session(ScriptedProvider::texts(&["Hi", " there"]));
        let mut renderer = RecordingRenderer::default();

        let outcome = session.send("Hello", &mut renderer).await;
        assert!(matches!(outcome, SubmitOutcome::Completed(ref turn) if turn.text == "Hi there"));

        let messages = session.conversation().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].text, "Hello");
        assert_eq!(messages[1].role, Role::Model);
        assert_eq!(messages[1].text, "Hi there");
        assert_eq!(messages[1].state, MessageState::Complete);
        assert!(!messages[1].is_error());

        assert_eq!(renderer.updates, vec!["Hi", "Hi there"]);
        assert_eq!(renderer.finished.len(), 1);
        assert!(!session.conversation().is_loading());
        assert_eq!(session.conversation().input(), "");
    }

    #[tokio::test]
    async fn failure_is_recorded_on_the_reply() {
        let mut session = session(ScriptedProvider::new(vec![
            Ok(GenerateContentResponse::from_text("partial")),
            Err(Error::service_unavailable("overloaded", None)),
        ]));
        let mut renderer = RecordingRenderer::default();

        let outcome = session.send("Hello", &mut renderer).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ref err) if err.is_server_error()));

        let reply = &session.conversation().messages()[1];
        assert!(reply.is_error());
        assert!(reply.text.starts_with("Error: "));
        assert!(reply.text.contains("overloaded"));
        assert!(!session.conversation().is_loading());
        assert_eq!(session.stats().failed_requests, 1);
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_turn() {
        let mut session = session(ScriptedProvider::without_credentials());
        let mut renderer = RecordingRenderer::default();

        let outcome = session.send("Hello", &mut renderer).await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ref err) if err.is_configuration()));
        assert!(renderer.updates.is_empty());
        assert!(session.conversation().messages()[1].is_error());
    }

    #[tokio::test]
    async fn busy_session_ignores_submissions() {
        let mut session = session(ScriptedProvider::texts(&["x"]));
        let mut renderer = RecordingRenderer::default();
        session.conversation_mut().set_loading(true);

        let outcome = session.send("Hello", &mut renderer).await;
        assert!(matches!(outcome, SubmitOutcome::Ignored));
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.conversation().input(), "Hello");
    }

    #[tokio::test]
    async fn empty_input_is_ignored() {
        let mut session = session(ScriptedProvider::texts(&["x"]));
        let mut renderer = RecordingRenderer::default();
        let outcome = session.send("   ", &mut renderer).await;
        assert!(matches!(outcome, SubmitOutcome::Ignored));
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.adapter.provider().request_count(), 0);
    }

    #[tokio::test]
    async fn history_excludes_failed_turns() {
        let mut session = session(ScriptedProvider::without_credentials());
        let mut renderer = RecordingRenderer::default();
        session.send("first", &mut renderer).await;

        let mut retry = ChatSession::new(ScriptedProvider::texts(&["ok"]), &ChatConfig::new());
        *retry.conversation_mut() = session.conversation().clone();
        retry.send("second", &mut renderer).await;

        let request = retry.adapter.provider().last_request().unwrap();
        let texts: Vec<_> = request
            .contents
            .iter()
            .map(|content| content.parts.last().and_then(Part::as_text).unwrap())
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn attachments_travel_with_the_user_message() {
        let mut session = session(ScriptedProvider::texts(&["a cat"]));
        let mut renderer = RecordingRenderer::default();
        session
            .conversation_mut()
            .add_attachments([Attachment::new("image/png", "AAAA", "cat.png")]);

        session.send("", &mut renderer).await;
        let user = &session.conversation().messages()[0];
        assert_eq!(user.attachments.len(), 1);
        assert!(session.conversation().attachments().is_empty());

        let request = session.adapter.provider().last_request().unwrap();
        assert_eq!(request.contents[0].parts.len(), 2);
        assert_eq!(request.contents[0].parts[1], Part::text(""));
    }

    #[test]
    fn attach_and_detach() {
        let dir = std::env::temp_dir().join(format!("coporties-session-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("notes.txt");
        std::fs::write(&good, b"hello").unwrap();

        let mut session = session(ScriptedProvider::texts(&[]));
        let report = session.attach([good.clone(), dir.join("missing.png")]);
        assert_eq!(report.attachments.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(session.stats().pending_attachments, 1);

        assert!(session.detach(2).is_err());
        assert!(session.detach(0).is_err());
        session.detach(1).unwrap();
        assert_eq!(session.stats().pending_attachments, 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn clear_session() {
        let mut session = session(ScriptedProvider::texts(&["reply"]));
        let mut renderer = RecordingRenderer::default();
        session.set_temperature(1.25).unwrap();
        session.send("Hello", &mut renderer).await;
        assert_eq!(session.message_count(), 2);

        session.clear();
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.stats().temperature, 1.25);
    }

    #[test]
    fn set_model() {
        let mut session = session(ScriptedProvider::texts(&[]));
        session.set_model(Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(session.model(), &Model::Known(KnownModel::Gemini25Pro));
    }

    #[test]
    fn settings_are_validated() {
        let mut session = session(ScriptedProvider::texts(&[]));
        assert!(session.set_temperature(2.5).unwrap_err().is_validation());
        assert_eq!(session.stats().temperature, 0.7);
        assert!(session.set_top_p(-0.1).is_err());
        session.set_top_p(0.5).unwrap();
        session.set_top_k(12);
        session.set_system_instruction(Some("Be brief.".to_string()));

        let stats = session.stats();
        assert_eq!(stats.top_p, 0.5);
        assert_eq!(stats.top_k, 12);
        assert_eq!(session.system_instruction(), Some("Be brief."));
    }

    #[tokio::test]
    async fn usage_is_totalled() {
        let usage = |prompt, candidates| UsageMetadata {
            prompt_token_count: prompt,
            candidates_token_count: candidates,
            total_token_count: prompt + candidates,
        };
        let mut last = GenerateContentResponse::from_text("!");
        last.usage_metadata = Some(usage(10, 4));
        let mut session = session(ScriptedProvider::new(vec![
            Ok(GenerateContentResponse::from_text("hi")),
            Ok(last),
        ]));
        let mut renderer = RecordingRenderer::default();

        session.send("one", &mut renderer).await;
        session.send("two", &mut renderer).await;

        let stats = session.stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_prompt_tokens, 20);
        assert_eq!(stats.total_candidates_tokens, 8);
        assert_eq!(stats.total_tokens, 28);
        assert_eq!(stats.last_turn_usage, Some(usage(10, 4)));
        assert_eq!(stats.message_count, 4);
    }
}
