//! Mock chat model for testing
//!
//! Replies are served from a queue shared by every chat the model starts, and
//! each chat's seed history and sent message are recorded for inspection.

use super::{ChatModel, ChatReply, ChatSession, ChatTurn, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    replies: VecDeque<Result<ChatReply, LlmError>>,
    started_histories: Vec<Vec<ChatTurn>>,
    sent_messages: Vec<String>,
}

/// Mock chat model that returns queued replies
pub struct MockChatModel {
    state: Arc<Mutex<MockState>>,
    model_id: String,
}

impl MockChatModel {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            model_id: model_id.into(),
        }
    }

    /// Queue a successful reply
    pub fn queue_reply(&self, text: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .replies
            .push_back(Ok(ChatReply::text(text)));
    }

    /// Queue an error
    pub fn queue_error(&self, error: LlmError) {
        self.state.lock().unwrap().replies.push_back(Err(error));
    }

    /// History each chat was started with, in order
    pub fn started_histories(&self) -> Vec<Vec<ChatTurn>> {
        self.state.lock().unwrap().started_histories.clone()
    }

    /// Every message passed to `send_message`, in order
    pub fn sent_messages(&self) -> Vec<String> {
        self.state.lock().unwrap().sent_messages.clone()
    }
}

impl ChatModel for MockChatModel {
    fn start_chat(&self, history: Vec<ChatTurn>) -> Box<dyn ChatSession> {
        self.state
            .lock()
            .unwrap()
            .started_histories
            .push(history.clone());
        Box::new(MockChatSession {
            state: self.state.clone(),
            history,
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

struct MockChatSession {
    state: Arc<Mutex<MockState>>,
    history: Vec<ChatTurn>,
}

#[async_trait]
impl ChatSession for MockChatSession {
    async fn send_message(&mut self, text: &str) -> Result<ChatReply, LlmError> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.sent_messages.push(text.to_string());
            state
                .replies
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::network("No mock reply queued")))
        };
        let reply = next?;
        self.history.push(ChatTurn::user(text));
        self.history.push(ChatTurn::model(reply.text.clone()));
        Ok(reply)
    }

    fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}
