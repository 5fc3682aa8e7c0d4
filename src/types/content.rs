use serde::{Deserialize, Serialize};

use crate::types::{Part, Role};

/// A role-tagged list of parts; one entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Author of the content.  Absent for system instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Ordered parts.
    pub parts: Vec<Part>,
}

impl Content {
    /// Create content authored by `role`.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            role: Some(role),
            parts,
        }
    }

    /// Create role-less content, as used for system instructions.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}
