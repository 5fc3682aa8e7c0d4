//! The streaming chat session adapter.
//!
//! [`StreamingAdapter`] turns a history snapshot plus a new user turn into a
//! provider request, opens the stream, and reports the cumulative reply text
//! after every chunk.  It never touches the conversation store: the caller
//! owns the transcript and decides what to do with each update.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;

use crate::accumulating_stream::{AccumulatingStream, StreamSummary};
use crate::attachment::Attachment;
use crate::client_logger::ClientLogger;
use crate::conversation::{GenerationConfig, Message};
use crate::error::{Error, Result};
use crate::observability::{TURNS_COMPLETED, TURNS_FAILED};
use crate::provider::ModelProvider;
use crate::types::{
    Content, FinishReason, GenerateContentRequest, GenerateContentResponse, Model, Part, Role,
    UsageMetadata,
};

/// Where a turn is in its life.
///
/// `Idle -> RequestBuilt -> Streaming -> {Complete | Failed}`.  A failure can
/// also happen from `Idle` or `RequestBuilt`.  The terminal states absorb.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// Nothing has happened yet.
    Idle,
    /// Credentials checked and the request assembled.
    RequestBuilt,
    /// The provider accepted the request and chunks are arriving.
    Streaming,
    /// The stream drained.
    Complete,
    /// The turn was rejected.
    Failed,
}

impl TurnState {
    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Complete | TurnState::Failed)
    }

    fn can_advance_to(&self, next: TurnState) -> bool {
        matches!(
            (self, next),
            (TurnState::Idle, TurnState::RequestBuilt)
                | (TurnState::RequestBuilt, TurnState::Streaming)
                | (TurnState::Streaming, TurnState::Complete)
                | (TurnState::Idle | TurnState::RequestBuilt | TurnState::Streaming, TurnState::Failed)
        )
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Idle => "idle",
            TurnState::RequestBuilt => "request_built",
            TurnState::Streaming => "streaming",
            TurnState::Complete => "complete",
            TurnState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The result of a successful turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    /// Final reply text.
    pub text: String,
    /// Token accounting, when the provider reported it.
    pub usage: Option<UsageMetadata>,
    /// Why generation stopped.
    pub finish_reason: Option<FinishReason>,
    /// Model version that served the turn.
    pub model_version: Option<String>,
    /// Number of chunks received.
    pub chunks: usize,
}

impl From<StreamSummary> for TurnOutcome {
    fn from(summary: StreamSummary) -> Self {
        Self {
            text: summary.text,
            usage: summary.usage,
            finish_reason: summary.finish_reason,
            model_version: summary.model_version,
            chunks: summary.chunks,
        }
    }
}

/// Runs chat turns against a [`ModelProvider`].
pub struct StreamingAdapter<P: ModelProvider> {
    provider: P,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl<P: ModelProvider> StreamingAdapter<P> {
    /// Create an adapter over `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            logger: None,
        }
    }

    /// Install a logger that sees every request, chunk and state change.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The provider this adapter talks to.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run one turn and return the final reply text.
    ///
    /// `on_chunk` receives the cumulative text after every chunk, in arrival
    /// order.  It is never called after the turn fails.
    pub async fn send_turn<F>(
        &self,
        model: &Model,
        history: &[Message],
        text: &str,
        attachments: &[Attachment],
        config: &GenerationConfig,
        on_chunk: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        self.send_turn_detailed(model, history, text, attachments, config, on_chunk)
            .await
            .map(|outcome| outcome.text)
    }

    /// Like [`send_turn`](Self::send_turn) but also returns usage and the
    /// finish reason.
    pub async fn send_turn_detailed<F>(
        &self,
        model: &Model,
        history: &[Message],
        text: &str,
        attachments: &[Attachment],
        config: &GenerationConfig,
        on_chunk: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&str),
    {
        let mut tracker = TurnTracker::new(self.logger.as_deref());
        let result = self
            .run_turn(
                &mut tracker,
                model,
                history,
                text,
                attachments,
                config,
                on_chunk,
            )
            .await;
        match &result {
            Ok(_) => {
                TURNS_COMPLETED.click();
                tracker.advance(TurnState::Complete);
            }
            Err(_) => {
                TURNS_FAILED.click();
                tracker.advance(TurnState::Failed);
            }
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_turn<F>(
        &self,
        tracker: &mut TurnTracker<'_>,
        model: &Model,
        history: &[Message],
        text: &str,
        attachments: &[Attachment],
        config: &GenerationConfig,
        mut on_chunk: F,
    ) -> Result<TurnOutcome>
    where
        F: FnMut(&str),
    {
        self.provider.ensure_credentials()?;
        config.validate()?;

        let request = build_request(history, text, attachments, config);
        if let Some(logger) = tracker.logger {
            logger.log_request(model, &request);
        }
        tracker.advance(TurnState::RequestBuilt);

        let chunks = self.provider.stream_generate(model, request).await?;
        tracker.advance(TurnState::Streaming);

        let (mut stream, summary_rx) = AccumulatingStream::new(chunks);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(logger) = tracker.logger {
                logger.log_stream_chunk(&chunk);
            }
            check_blocked(&chunk)?;
            on_chunk(stream.text());
        }

        let summary = summary_rx
            .await
            .map_err(|_| Error::streaming("stream ended without a summary", None))?;
        if let Some(logger) = tracker.logger {
            logger.log_turn_complete(&summary);
        }
        Ok(summary.into())
    }
}

/// Follows a turn through its states and reports each change.
struct TurnTracker<'a> {
    state: TurnState,
    logger: Option<&'a dyn ClientLogger>,
}

impl<'a> TurnTracker<'a> {
    fn new(logger: Option<&'a dyn ClientLogger>) -> Self {
        Self {
            state: TurnState::Idle,
            logger,
        }
    }

    fn advance(&mut self, next: TurnState) {
        if !self.state.can_advance_to(next) {
            return;
        }
        self.state = next;
        if let Some(logger) = self.logger {
            logger.log_turn_state(next);
        }
    }
}

fn check_blocked(chunk: &GenerateContentResponse) -> Result<()> {
    if chunk.candidates.is_empty()
        && let Some(reason) = chunk.block_reason()
    {
        let message = chunk
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason_message.clone());
        return Err(Error::blocked(reason, message));
    }
    Ok(())
}

/// Map one message to provider content: attachments first, then the text.
///
/// The text part is always present, even when empty.
pub fn message_content(role: Role, text: &str, attachments: &[Attachment]) -> Content {
    let mut parts: Vec<Part> = attachments.iter().map(Attachment::to_part).collect();
    parts.push(Part::text(text));
    Content::new(role, parts)
}

/// Map a history snapshot to provider content, dropping failed messages.
pub fn map_history(history: &[Message]) -> Vec<Content> {
    history
        .iter()
        .filter(|message| !message.is_error())
        .map(|message| message_content(message.role, &message.text, &message.attachments))
        .collect()
}

/// Assemble the request for a new user turn.
pub fn build_request(
    history: &[Message],
    text: &str,
    attachments: &[Attachment],
    config: &GenerationConfig,
) -> GenerateContentRequest {
    let mut contents = map_history(history);
    contents.push(message_content(Role::User, text, attachments));

    let request = GenerateContentRequest::new(contents).with_generation_config(config.to_param());
    match config.effective_system_instruction() {
        Some(instruction) => request.with_system_instruction(instruction),
        None => request,
    }
}
