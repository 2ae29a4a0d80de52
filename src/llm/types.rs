//! Common types for chat model interactions

/// Speaker tag as the remote model understands it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// One prior message used to prime a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub parts: Vec<String>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            parts: vec![text.into()],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            parts: vec![text.into()],
        }
    }

    /// All text parts joined together
    #[allow(dead_code)] // Used in tests
    pub fn text(&self) -> String {
        self.parts.concat()
    }
}

/// Reply to a single `send_message`
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

impl ChatReply {
    #[allow(dead_code)] // Constructor for mocks
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some("STOP".to_string()),
            usage: Usage::default(),
        }
    }
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
