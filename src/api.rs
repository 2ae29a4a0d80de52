//! HTTP surface: the chat page, its form endpoint, and a small JSON API

mod assets;
mod handlers;
mod render;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::llm::ChatModel;
use crate::session::SessionStore;
use crate::system_prompt::PageConfig;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub model: Arc<dyn ChatModel>,
    pub page: PageConfig,
}

impl AppState {
    pub fn new(sessions: Arc<SessionStore>, model: Arc<dyn ChatModel>, page: PageConfig) -> Self {
        Self {
            sessions,
            model,
            page,
        }
    }
}
