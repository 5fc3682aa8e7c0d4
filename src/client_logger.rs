//! Logging trait for chat turns.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log every request and streamed chunk passing through the
//! [`StreamingAdapter`](crate::StreamingAdapter).

use crate::{GenerateContentRequest, GenerateContentResponse, Model, StreamSummary, TurnState};

/// A trait for logging chat turns.
///
/// Implement this trait to capture and record all API interactions,
/// including the outgoing request and individual streamed chunks.
///
/// # Example
///
/// ```rust,ignore
/// use coporties::{ClientLogger, GenerateContentRequest, GenerateContentResponse, Model};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, model: &Model, request: &GenerateContentRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "{model}: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &GenerateContentResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log the request about to be sent.
    fn log_request(&self, model: &Model, request: &GenerateContentRequest);

    /// Log an individual streamed chunk.
    ///
    /// Called once per chunk, in arrival order, before the chunk's text is
    /// handed to the caller.
    fn log_stream_chunk(&self, chunk: &GenerateContentResponse);

    /// Log a turn state transition.
    fn log_turn_state(&self, _state: TurnState) {}

    /// Log the summary of a turn whose stream drained successfully.
    fn log_turn_complete(&self, _summary: &StreamSummary) {}
}
