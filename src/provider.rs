//! The seam between the chat and whatever performs inference.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

/// A stream of response chunks, in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// A hosted generation service.
///
/// [`crate::Gemini`] is the production implementation; tests substitute
/// scripted providers.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Fails with a configuration error when the provider cannot possibly
    /// authenticate.  Must not touch the network.
    fn ensure_credentials(&self) -> Result<()>;

    /// Opens a streaming generation call.
    async fn stream_generate(
        &self,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<ChunkStream>;
}
