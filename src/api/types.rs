//! API request and response types

use crate::conversation::Attachment;
use serde::{Deserialize, Serialize};

/// Request to start a new session. Exactly one document source is required.
#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    pub url: Option<String>,
    /// Document text
    pub content: Option<String>,
    /// Uploaded file, base64-encoded
    pub content_base64: Option<String>,
    /// Instruction to submit as soon as the session is open
    pub instruction: Option<String>,
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub base_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Response for an accepted chat message
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub request_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
