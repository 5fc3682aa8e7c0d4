use serde::{Deserialize, Serialize};

use crate::types::{Content, GenerationConfigParam};

/// Body of a `generateContent` / `streamGenerateContent` call.
///
/// The model id travels in the URL, not the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Prior history followed by the new turn.
    pub contents: Vec<Content>,

    /// Optional system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Sampling parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfigParam>,
}

impl GenerateContentRequest {
    /// Create a request with the given contents.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            system_instruction: None,
            generation_config: None,
        }
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::system(text));
        self
    }

    /// Sets the sampling parameters.
    pub fn with_generation_config(mut self, config: GenerationConfigParam) -> Self {
        self.generation_config = Some(config);
        self
    }
}
