//! API request and response types

use crate::session::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Request to verify an API key
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub api_key: String,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response with a freshly created session
#[derive(Debug, Serialize)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub session: SessionSnapshot,
}

/// Response for key verification
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    pub session: SessionSnapshot,
}

/// Response for chat action. A refused submission is not an HTTP error.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub session: SessionSnapshot,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Model information shown next to the chat
#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub model: String,
    pub provider: String,
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
