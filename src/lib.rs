// Public modules
pub mod accumulating_stream;
pub mod adapter;
pub mod attachment;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod conversation;
pub mod error;
pub mod provider;
pub mod render;
pub mod sse;
pub mod types;

mod observability;

// Re-exports
pub use accumulating_stream::{AccumulatingStream, StreamSummary};
pub use adapter::{StreamingAdapter, TurnOutcome, TurnState, build_request, map_history};
pub use attachment::{Attachment, AttachmentFailure, IngestReport, ingest_files};
pub use client::Gemini;
pub use client_logger::ClientLogger;
pub use conversation::{Conversation, GenerationConfig, Message, MessageId, MessageState};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use provider::{ChunkStream, ModelProvider};
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
