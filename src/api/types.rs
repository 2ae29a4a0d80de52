//! API request and response types

use crate::conversation::Turn;
use serde::{Deserialize, Serialize};

/// Form body posted by the chat page
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub prompt: String,
}

/// JSON request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Current transcript
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub turns: Vec<Turn>,
}

/// A failed submission; `turns` still includes the user's message
#[derive(Debug, Serialize)]
pub struct ChatErrorResponse {
    pub error: String,
    pub turns: Vec<Turn>,
}

/// Health probe body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
}
