//! Accumulates streamed chunks into a turn summary while passing chunks through.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::Stream;

use crate::observability::{STREAM_CHUNKS, STREAM_DURATION, STREAM_ERRORS};
use crate::{Error, FinishReason, GenerateContentResponse, UsageMetadata};

/// Everything a drained stream produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    /// Concatenation of every chunk's text, in arrival order.
    pub text: String,
    /// Last finish reason the provider reported.
    pub finish_reason: Option<FinishReason>,
    /// Last usage report.  The provider sends running totals, so the last wins.
    pub usage: Option<UsageMetadata>,
    /// Model version that served the turn.
    pub model_version: Option<String>,
    /// Number of chunks received.
    pub chunks: usize,
}

/// A stream wrapper that accumulates [`GenerateContentResponse`] chunks.
///
/// This allows showing partial text to the user while simultaneously building
/// the final reply without buffering.  When the stream is fully drained, the
/// summary is sent via the oneshot channel returned by `new()`.  If the stream
/// yields an error first, the sender is dropped and no summary is delivered.
pub struct AccumulatingStream {
    inner: Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, Error>> + Send>>,
    summary_tx: Option<tokio::sync::oneshot::Sender<StreamSummary>>,
    summary: StreamSummary,
    started: Instant,
}

impl AccumulatingStream {
    /// Wraps a chunk stream.
    ///
    /// Returns the stream and a receiver that will contain the summary once the
    /// stream is fully drained.
    pub fn new<S>(stream: S) -> (Self, tokio::sync::oneshot::Receiver<StreamSummary>)
    where
        S: Stream<Item = Result<GenerateContentResponse, Error>> + Send + 'static,
    {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let this = Self {
            inner: Box::pin(stream),
            summary_tx: Some(tx),
            summary: StreamSummary::default(),
            started: Instant::now(),
        };
        (this, rx)
    }

    /// Cumulative text received so far.
    pub fn text(&self) -> &str {
        &self.summary.text
    }

    fn accumulate(&mut self, chunk: &GenerateContentResponse) {
        STREAM_CHUNKS.click();
        self.summary.chunks += 1;
        self.summary.text.push_str(&chunk.text());
        if let Some(reason) = chunk.finish_reason() {
            self.summary.finish_reason = Some(reason.clone());
        }
        if let Some(usage) = chunk.usage_metadata {
            self.summary.usage = Some(usage);
        }
        if chunk.model_version.is_some() {
            self.summary.model_version = chunk.model_version.clone();
        }
    }
}

impl Stream for AccumulatingStream {
    type Item = Result<GenerateContentResponse, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.accumulate(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                STREAM_ERRORS.click();
                self.summary_tx.take();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                if let Some(tx) = self.summary_tx.take() {
                    STREAM_DURATION.add(self.started.elapsed().as_secs_f64());
                    let _ = tx.send(self.summary.clone());
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
