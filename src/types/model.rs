use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a model identifier.
///
/// This can be a predefined model version or a custom string value for models
/// that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or tuned models)
    Custom(String),
}

/// Known model versions
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Gemini 3 Flash (preview); the default.
    Gemini3FlashPreview,

    /// Gemini 3 Pro (preview).
    Gemini3ProPreview,

    /// Gemini 2.5 Flash.
    Gemini25Flash,

    /// Gemini 2.5 Pro.
    Gemini25Pro,
}

impl KnownModel {
    /// Every known model, in the order offered to users.
    pub const ALL: [KnownModel; 4] = [
        KnownModel::Gemini3FlashPreview,
        KnownModel::Gemini3ProPreview,
        KnownModel::Gemini25Flash,
        KnownModel::Gemini25Pro,
    ];

    /// The provider's id for this model.
    pub fn id(&self) -> &'static str {
        match self {
            KnownModel::Gemini3FlashPreview => "gemini-3-flash-preview",
            KnownModel::Gemini3ProPreview => "gemini-3-pro-preview",
            KnownModel::Gemini25Flash => "gemini-2.5-flash",
            KnownModel::Gemini25Pro => "gemini-2.5-pro",
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gemini3FlashPreview)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("models/").unwrap_or(s);
        Ok(KnownModel::ALL
            .into_iter()
            .find(|known| known.id() == s)
            .map(Model::Known)
            .unwrap_or_else(|| Model::Custom(s.to_string())))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        match model.parse() {
            Ok(model) => model,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::from(model.to_string())
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.to_string()
    }
}
