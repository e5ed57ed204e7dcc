//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::session::Value;

/// Response for the visit counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitResponse {
    /// The visitor's session ID.
    pub session_id: String,
    /// Number of visits in this session, including this one.
    pub visits: i64,
}

/// A single session value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: Value,
}

/// Keys stored in the current session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysResponse {
    pub session_id: String,
    pub keys: Vec<String>,
}

/// Generic API error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "KEY_NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn key_not_found(key: &str) -> Self {
        Self::new("KEY_NOT_FOUND", format!("Key '{}' is not set in this session", key))
    }
}
