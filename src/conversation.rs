//! The conversation store.
//!
//! [`Conversation`] owns the transcript, the pending input and attachments,
//! the generation settings and the selected model.  Messages are values: an
//! update builds a new [`Message`] and swaps it into place, and a message in a
//! terminal [`MessageState`] is never replaced again.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::attachment::Attachment;
use crate::error::{Error, Result};
use crate::types::{GenerationConfigParam, Model, Role};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default top-k.
pub const DEFAULT_TOP_K: u32 = 40;
/// Default top-p.
pub const DEFAULT_TOP_P: f32 = 0.95;

/// Unique identifier of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// A fresh, random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle of a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// A reply still receiving chunks.  The only non-terminal state.
    Streaming,
    /// Final text.
    Complete,
    /// The turn failed; the text describes the failure.
    Failed,
}

impl MessageState {
    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MessageState::Streaming)
    }
}

/// A message in the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Text; for a streaming reply, the cumulative text received so far.
    pub text: String,
    /// Files sent with the message.  Only user messages carry any.
    pub attachments: Vec<Attachment>,
    /// Creation time.
    pub timestamp: OffsetDateTime,
    /// Lifecycle state.
    pub state: MessageState,
}

impl Message {
    fn new(role: Role, text: String, attachments: Vec<Attachment>, state: MessageState) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            text,
            attachments,
            timestamp: OffsetDateTime::now_utc(),
            state,
        }
    }

    /// A complete user message.
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self::new(Role::User, text.into(), attachments, MessageState::Complete)
    }

    /// An empty model reply waiting for chunks.
    pub fn placeholder() -> Self {
        Self::new(Role::Model, String::new(), Vec::new(), MessageState::Streaming)
    }

    /// A complete model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text.into(), Vec::new(), MessageState::Complete)
    }

    /// True when the message records a failed turn.
    pub fn is_error(&self) -> bool {
        self.state == MessageState::Failed
    }

    /// True while chunks may still arrive.
    pub fn is_streaming(&self) -> bool {
        self.state == MessageState::Streaming
    }

    /// The same message with new text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    /// The same message, finished.
    pub fn completed(&self) -> Self {
        Self {
            state: MessageState::Complete,
            ..self.clone()
        }
    }

    /// The same message, failed with `error_text`.
    pub fn failed(&self, error_text: impl Into<String>) -> Self {
        Self {
            text: error_text.into(),
            state: MessageState::Failed,
            ..self.clone()
        }
    }
}

/// Sampling settings applied to the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature, 0.0 to 2.0.
    pub temperature: f32,
    /// Top-k sampling limit.
    pub top_k: u32,
    /// Nucleus sampling threshold, 0.0 to 1.0.
    pub top_p: f32,
    /// Optional system instruction.
    pub system_instruction: Option<String>,
}

impl GenerationConfig {
    /// Creates the default settings.
    pub fn new() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_k: DEFAULT_TOP_K,
            top_p: DEFAULT_TOP_P,
            system_instruction: None,
        }
    }

    /// Checks that every value is within the range the provider accepts.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::validation(
                format!("temperature {} is outside 0.0..=2.0", self.temperature),
                Some("temperature".to_string()),
            ));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(Error::validation(
                format!("top_p {} is outside 0.0..=1.0", self.top_p),
                Some("top_p".to_string()),
            ));
        }
        Ok(())
    }

    /// The system instruction, unless it is blank.
    pub fn effective_system_instruction(&self) -> Option<&str> {
        self.system_instruction
            .as_deref()
            .filter(|instruction| !instruction.trim().is_empty())
    }

    /// The sampling parameters in request form.
    pub fn to_param(&self) -> GenerationConfigParam {
        GenerationConfigParam::new()
            .with_temperature(self.temperature)
            .with_top_k(self.top_k)
            .with_top_p(self.top_p)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The transcript plus everything the user is composing.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    attachments: Vec<Attachment>,
    config: GenerationConfig,
    model: Model,
    loading: bool,
}

impl Conversation {
    /// An empty conversation with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty conversation with the given model and settings.
    pub fn with_settings(model: Model, config: GenerationConfig) -> Self {
        Self {
            model,
            config,
            ..Self::default()
        }
    }

    /// Appends a user message.
    ///
    /// Fails when there is neither text nor an attachment to send.
    pub fn append_user_message(
        &mut self,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<Message> {
        let text = text.into();
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(Error::validation(
                "a message needs text or at least one attachment",
                Some("text".to_string()),
            ));
        }
        let message = Message::user(text, attachments);
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Appends an empty, streaming model reply.
    pub fn append_placeholder_reply(&mut self) -> Message {
        let message = Message::placeholder();
        self.messages.push(message.clone());
        message
    }

    /// Replaces the text of a streaming message.
    ///
    /// Unknown ids and terminal messages are left alone.
    pub fn update_message_text(&mut self, id: &MessageId, text: impl Into<String>) {
        if let Some(slot) = self.streaming_slot(id) {
            *slot = slot.with_text(text);
        }
    }

    /// Marks a streaming message complete.
    pub fn complete_message(&mut self, id: &MessageId) {
        if let Some(slot) = self.streaming_slot(id) {
            *slot = slot.completed();
        }
    }

    /// Replaces a streaming message's text with an error description and
    /// fails it.
    ///
    /// After this the message no longer changes.  Messages that are already
    /// terminal, including every user message, are left alone.
    pub fn mark_error(&mut self, id: &MessageId, error_text: impl Into<String>) {
        if let Some(slot) = self.streaming_slot(id) {
            *slot = slot.failed(error_text);
        }
    }

    /// Empties the transcript, the pending input and the pending attachments.
    ///
    /// Settings and the selected model survive.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.input.clear();
        self.attachments.clear();
    }

    fn streaming_slot(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| &m.id == id)
            .filter(|m| m.is_streaming())
    }

    /// The transcript, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Looks up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The text being composed.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replaces the text being composed.
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Attachments queued for the next message.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Queues attachments for the next message.
    pub fn add_attachments(&mut self, attachments: impl IntoIterator<Item = Attachment>) {
        self.attachments.extend(attachments);
    }

    /// Drops a queued attachment by position.
    pub fn remove_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.attachments.len() {
            Some(self.attachments.remove(index))
        } else {
            None
        }
    }

    /// True when the pending input has something worth sending.
    pub fn has_pending(&self) -> bool {
        !self.input.trim().is_empty() || !self.attachments.is_empty()
    }

    /// Takes the pending input and attachments, leaving both empty.
    pub fn take_pending(&mut self) -> (String, Vec<Attachment>) {
        (
            std::mem::take(&mut self.input),
            std::mem::take(&mut self.attachments),
        )
    }

    /// Settings for the next turn.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Settings for the next turn, for mutation.
    pub fn config_mut(&mut self) -> &mut GenerationConfig {
        &mut self.config
    }

    /// The selected model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Selects a model for the next turn.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
    }

    /// True while a turn is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Sets the in-flight flag.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }
}
