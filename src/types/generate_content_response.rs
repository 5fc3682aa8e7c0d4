use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One chunk of a streamed response, or a whole non-streamed response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate completions.  The chat only ever asks for one.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Set when the prompt itself was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Token accounting; usually present on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,

    /// Exact model version that served the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Create a response carrying a single text candidate.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    role: Some(Role::Model),
                    parts: vec![ResponsePart {
                        text: Some(text.into()),
                        thought: None,
                    }],
                }),
                finish_reason: None,
                index: Some(0),
            }],
            ..Self::default()
        }
    }

    /// Text delta carried by this chunk.
    ///
    /// Concatenates the text parts of the first candidate, skipping thought
    /// summaries.  Chunks without text yield the empty string.
    pub fn text(&self) -> String {
        let Some(content) = self.candidates.first().and_then(|c| c.content.as_ref()) else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter(|part| part.thought != Some(true))
            .filter_map(|part| part.text.as_deref())
            .collect()
    }

    /// Finish reason of the first candidate, if the provider sent one.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.candidates.first().and_then(|c| c.finish_reason.as_ref())
    }

    /// Block reason when the prompt was refused outright.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
}

/// A candidate completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CandidateContent>,

    /// Why generation stopped; only present on the last chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Candidate index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// Content of a candidate.
///
/// Parts are parsed leniently: anything that is not text is kept as an empty
/// part so new part kinds never break the stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateContent {
    /// Author, normally `model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Generated parts.
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

/// A generated part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePart {
    /// Generated text, if this is a text part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// True for thought summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop point.
    Stop,
    /// Output token limit reached.
    MaxTokens,
    /// Flagged by safety filters.
    Safety,
    /// Flagged for recitation.
    Recitation,
    /// Any other reason the provider reports.
    #[serde(other)]
    Other,
}

/// Feedback about the prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Reason the prompt was blocked, e.g. `SAFETY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    /// Optional explanation of the block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason_message: Option<String>,
}

/// Token accounting for a request.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, history included.
    #[serde(default)]
    pub prompt_token_count: u64,

    /// Tokens generated across candidates.
    #[serde(default)]
    pub candidates_token_count: u64,

    /// Total billed tokens.
    #[serde(default)]
    pub total_token_count: u64,
}

impl std::ops::Add for UsageMetadata {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt_token_count: self.prompt_token_count + rhs.prompt_token_count,
            candidates_token_count: self.candidates_token_count + rhs.candidates_token_count,
            total_token_count: self.total_token_count + rhs.total_token_count,
        }
    }
}
