//! Wire types for the provider's `generateContent` API.

// Public modules
pub mod content;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod generation_config_param;
pub mod model;
pub mod part;
pub mod role;

// Re-exports
pub use content::Content;
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{
    Candidate, CandidateContent, FinishReason, GenerateContentResponse, PromptFeedback,
    ResponsePart, UsageMetadata,
};
pub use generation_config_param::GenerationConfigParam;
pub use model::{KnownModel, Model};
pub use part::{Blob, Part};
pub use role::Role;
