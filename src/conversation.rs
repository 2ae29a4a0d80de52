//! Conversation state: the append-only transcript and the submit cycle
//!
//! Each submission appends the user's turn, replays everything before it to
//! the model as history, sends the new text as the active message, and
//! appends the reply. The in-flight turn is never part of the replayed
//! history.

#[cfg(test)]
mod proptests;

use crate::llm::{ChatModel, ChatRole, ChatTurn, LlmError};
use crate::system_prompt::GREETING;
use serde::Serialize;
use thiserror::Error;

/// Who said a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn chat_role(self) -> ChatRole {
        match self {
            Speaker::User => ChatRole::User,
            Speaker::Assistant => ChatRole::Model,
        }
    }
}

/// One message in the transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn to_chat_turn(&self) -> ChatTurn {
        ChatTurn {
            role: self.speaker.chat_role(),
            parts: vec![self.text.clone()],
        }
    }
}

/// Ordered, append-only list of turns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn append(&mut self, speaker: Speaker, text: impl Into<String>) {
        self.turns.push(Turn {
            speaker,
            text: text.into(),
        });
    }
}

/// History to seed the model with when the transcript's last turn is the
/// message being submitted: every turn except that last one.
pub fn history_slice(transcript: &Transcript) -> Vec<ChatTurn> {
    match transcript.turns().split_last() {
        Some((_pending, prior)) => prior.iter().map(Turn::to_chat_turn).collect(),
        None => Vec::new(),
    }
}

/// Result of a submission that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing appended, no remote call
    Ignored,
    /// User and assistant turns both appended
    Replied,
}

/// A failed submission. The user's turn stays in the transcript.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("An error occurred: {0}")]
    Remote(#[from] LlmError),
    #[error("An error occurred: the model returned an empty reply")]
    EmptyReply,
}

/// Conversation state for one session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    transcript: Transcript,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Seed the greeting if the transcript is empty. Returns whether it did.
    pub fn initialize(&mut self) -> bool {
        if !self.transcript.is_empty() {
            return false;
        }
        self.transcript.append(Speaker::Assistant, GREETING);
        true
    }

    /// Run one user submission against `model`.
    pub async fn submit(
        &mut self,
        model: &dyn ChatModel,
        text: &str,
    ) -> Result<SubmitOutcome, SubmitError> {
        if text.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        self.transcript.append(Speaker::User, text);
        let history = history_slice(&self.transcript);

        let mut chat = model.start_chat(history);
        let reply = chat.send_message(text).await?;

        if reply.text.trim().is_empty() {
            return Err(SubmitError::EmptyReply);
        }

        self.transcript.append(Speaker::Assistant, reply.text);
        Ok(SubmitOutcome::Replied)
    }
}
