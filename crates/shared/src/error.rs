use serde::{Deserialize, Serialize};

/// Code the registry attaches when a delete is blocked by dependent rows.
pub const FOREIGN_KEY_CONSTRAINT: &str = "foreign_key_constraint";

/// Structured body of a non-success registry response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
        }
    }

    pub fn is_foreign_key_constraint(&self) -> bool {
        self.code.as_deref() == Some(FOREIGN_KEY_CONSTRAINT)
    }

    /// Message text, treating blank strings as absent.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}
