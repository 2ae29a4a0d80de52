//! Remote chat model abstraction
//!
//! A model starts a chat primed with prior turns; the chat then takes one new
//! message at a time and returns the full reply text.

mod error;
mod gemini;
mod types;

#[cfg(test)]
pub mod testing;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiModel;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// A configured remote model. System instruction, model id and decoding
/// parameters are fixed at construction.
pub trait ChatModel: Send + Sync {
    /// Start a chat seeded with `history`, oldest first
    fn start_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession>;

    fn model_id(&self) -> &str;
}

/// An in-progress chat
#[async_trait]
pub trait ChatSession: Send {
    /// Submit one message and wait for the whole reply. On success both the
    /// message and the reply are recorded in [`ChatSession::history`].
    async fn send_message(&mut self, text: &str) -> Result<ChatReply, LlmError>;

    fn history(&self) -> &[ChatTurn];
}

/// Logging wrapper for chat models
pub struct LoggingModel {
    inner: Arc<dyn ChatModel>,
    model_id: String,
}

impl LoggingModel {
    pub fn new(inner: Arc<dyn ChatModel>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

impl ChatModel for LoggingModel {
    fn start_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        tracing::debug!(model = %self.model_id, history_len = history.len(), "Starting chat");
        Box::new(LoggingSession {
            inner: self.inner.start_chat(history),
            model_id: self.model_id.clone(),
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

struct LoggingSession {
    inner: Box<dyn ChatSession>,
    model_id: String,
}

#[async_trait]
impl ChatSession for LoggingSession {
    async fn send_message(&mut self, text: &str) -> Result<ChatReply, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.send_message(text).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = reply.usage.input_tokens,
                    output_tokens = reply.usage.output_tokens,
                    finish_reason = reply.finish_reason.as_deref().unwrap_or("unknown"),
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = e.kind.as_str(),
                    transient = e.kind.is_transient(),
                    "Chat request failed"
                );
            }
        }

        result
    }

    fn history(&self) -> &[ChatTurn] {
        self.inner.history()
    }
}
