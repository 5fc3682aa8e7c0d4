use serde::{Deserialize, Serialize};

/// Raw bytes sent inline with a request, already base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// IANA media type of the payload, e.g. `image/png`.
    pub mime_type: String,

    /// Base64 encoded payload.
    pub data: String,
}

impl Blob {
    /// Create a new `Blob`.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// One piece of request content.
///
/// Serializes externally tagged, which is exactly the provider's shape:
/// `{"text": "..."}` or `{"inlineData": {"mimeType": "...", "data": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    /// Plain text.
    Text(String),

    /// Inline binary data.
    InlineData(Blob),
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    /// Create an inline data part.
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData(Blob::new(mime_type, data))
    }

    /// Returns the text of a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            Part::InlineData(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn text_part_serialization() {
        let part = Part::text("Hello");
        assert_eq!(to_value(&part).unwrap(), json!({"text": "Hello"}));
    }

    #[test]
    fn inline_data_part_serialization() {
        let part = Part::inline_data("image/png", "iVBORw0KGgo=");
        assert_eq!(
            to_value(&part).unwrap(),
            json!({
                "inlineData": {
                    "mimeType": "image/png",
                    "data": "iVBORw0KGgo="
                }
            })
        );
    }

    #[test]
    fn empty_text_part_still_serializes() {
        let part = Part::text("");
        assert_eq!(to_value(&part).unwrap(), json!({"text": ""}));
        assert_eq!(part.as_text(), Some(""));
    }
}
